use std::{fs, path::Path};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{Course, CourseDetail, CourseStore, Lesson, StoreError};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    courses: Vec<CatalogCourse>,
}

#[derive(Debug, Deserialize)]
struct CatalogCourse {
    #[serde(flatten)]
    course: Course,
    #[serde(default)]
    lessons: Vec<Lesson>,
}

/// Offline store backed by a JSON catalog file.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    courses: Vec<(Course, Vec<Lesson>)>,
}

impl CatalogStore {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read course catalog {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid course catalog {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(text)?;
        let courses = file
            .courses
            .into_iter()
            .map(|c| Self::normalize(c.course, c.lessons))
            .collect();
        Ok(Self { courses })
    }

    pub fn from_courses(courses: Vec<(Course, Vec<Lesson>)>) -> Self {
        let courses = courses
            .into_iter()
            .map(|(course, lessons)| Self::normalize(course, lessons))
            .collect();
        Self { courses }
    }

    fn normalize(mut course: Course, mut lessons: Vec<Lesson>) -> (Course, Vec<Lesson>) {
        lessons.sort_by_key(|l| l.order);
        for lesson in &mut lessons {
            if lesson.course_id.is_empty() {
                lesson.course_id = course.id.clone();
            }
        }
        if course.lessons_count == 0 {
            course.lessons_count = lessons.len();
        }
        (course, lessons)
    }

    fn find(&self, course_id: &str) -> Result<&(Course, Vec<Lesson>), StoreError> {
        self.courses
            .iter()
            .find(|(c, _)| c.id == course_id)
            .ok_or_else(|| StoreError::NotFound(format!("course '{}'", course_id)))
    }
}

#[async_trait]
impl CourseStore for CatalogStore {
    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        Ok(self.courses.iter().map(|(c, _)| c.clone()).collect())
    }

    async fn get_course(&self, course_id: &str) -> Result<CourseDetail, StoreError> {
        let (course, lessons) = self.find(course_id)?;
        Ok(CourseDetail {
            course: course.clone(),
            lessons: lessons.iter().map(Lesson::summary).collect(),
        })
    }

    async fn get_lesson(&self, course_id: &str, lesson_id: &str) -> Result<Lesson, StoreError> {
        let (_, lessons) = self.find(course_id)?;
        lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("lesson '{}'", lesson_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "courses": [{
            "id": "go-basics",
            "title": "Go basics",
            "description": "Core concepts",
            "instructor": "Zhang San",
            "duration": 12,
            "level": "beginner",
            "category": "programming",
            "lessons": [
                {"id": "loops", "title": "Loops", "order": 20, "code": "package main"},
                {"id": "hello", "title": "Hello", "order": 5, "code": "package main",
                 "expected_output": "Hello, World!\n"}
            ]
        }]
    }"#;

    #[tokio::test]
    async fn sorts_lessons_and_derives_counts() {
        let store = CatalogStore::from_json(CATALOG).unwrap();
        let courses = store.list_courses().await.unwrap();
        assert_eq!(courses[0].lessons_count, 2);

        let detail = store.get_course("go-basics").await.unwrap();
        let ids: Vec<_> = detail.lessons.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["hello", "loops"]);

        let lesson = store.get_lesson("go-basics", "hello").await.unwrap();
        assert_eq!(lesson.course_id, "go-basics");
        assert_eq!(lesson.expectation(), Some("Hello, World!\n"));
    }

    #[tokio::test]
    async fn missing_entities_are_not_found() {
        let store = CatalogStore::from_json(CATALOG).unwrap();
        assert!(matches!(store.get_course("rust").await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.get_lesson("go-basics", "maps").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
