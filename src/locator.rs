//! Shareable address of a course page and its selected lesson.
//!
//! Text form is `<course_id>?lesson=<lesson_id>`, with an optional leading
//! `course/` or `/course/` so browser-style paths paste in unchanged.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("course id is missing")]
    MissingCourse,
    #[error("invalid locator '{0}'")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub course_id: String,
    pub lesson_id: Option<String>,
}

impl Locator {
    pub fn course(course_id: impl Into<String>) -> Self {
        Self { course_id: course_id.into(), lesson_id: None }
    }

    pub fn with_lesson(mut self, lesson_id: impl Into<String>) -> Self {
        self.lesson_id = Some(lesson_id.into());
        self
    }
}

fn decode(raw: &str, whole: &str) -> Result<String, LocatorError> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|_| LocatorError::Malformed(whole.to_string()))
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let text = text
            .strip_prefix("/course/")
            .or_else(|| text.strip_prefix("course/"))
            .unwrap_or(text);
        let (path, query) = match text.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (text, None),
        };
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Err(LocatorError::MissingCourse);
        }
        if path.contains('/') {
            return Err(LocatorError::Malformed(s.to_string()));
        }

        let mut locator = Locator::course(decode(path, s)?);
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            if let Some(value) = pair.strip_prefix("lesson=") {
                if !value.is_empty() {
                    locator.lesson_id = Some(decode(value, s)?);
                }
            }
        }
        Ok(locator)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", urlencoding::encode(&self.course_id))?;
        if let Some(lesson) = &self.lesson_id {
            write!(f, "?lesson={}", urlencoding::encode(lesson))?;
        }
        Ok(())
    }
}
