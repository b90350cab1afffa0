//! Course and lesson data model plus the read-only store collaborator.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod catalog;
pub mod http;

pub use catalog::CatalogStore;
pub use http::HttpCourseStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub instructor: String,
    /// Estimated length in hours.
    pub duration: u32,
    pub level: Level,
    pub category: String,
    #[serde(default)]
    pub lessons_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Lesson row as listed inside a course; no content or code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    #[serde(default)]
    pub lessons: Vec<LessonSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    #[serde(default)]
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub order: i64,
    #[serde(default)]
    pub content: String,
    /// Starter source seeded into the editor.
    #[serde(default)]
    pub code: String,
    #[serde(default, deserialize_with = "deserialize_hints")]
    pub hints: Vec<String>,
    #[serde(default)]
    pub expected_output: Option<String>,
}

impl Lesson {
    /// Expected output, treating an empty string as "no expectation".
    pub fn expectation(&self) -> Option<&str> {
        self.expected_output.as_deref().filter(|s| !s.is_empty())
    }

    pub fn summary(&self) -> LessonSummary {
        LessonSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            order: self.order,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("course service unavailable: {0}")]
    Transport(String),
    #[error("malformed course data: {0}")]
    Malformed(String),
}

/// Narrow read API over wherever courses live.
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<Course>, StoreError>;

    /// Course with its lesson summaries sorted by `order`.
    async fn get_course(&self, course_id: &str) -> Result<CourseDetail, StoreError>;

    async fn get_lesson(&self, course_id: &str, lesson_id: &str) -> Result<Lesson, StoreError>;
}

/// Hints are stored as a JSON-encoded text column upstream, so accept an
/// array, a string holding an array, a bare string, or null.
fn deserialize_hints<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Text(String),
    }

    let hints = match Option::<Raw>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Raw::List(list)) => list,
        Some(Raw::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.starts_with('[') {
                serde_json::from_str::<Vec<String>>(trimmed).map_err(serde::de::Error::custom)?
            } else {
                vec![text]
            }
        }
    };
    Ok(hints.into_iter().filter(|h| !h.trim().is_empty()).collect())
}
