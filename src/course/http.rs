use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::{Course, CourseDetail, CourseStore, Lesson, StoreError};
use crate::config::Config;

pub const DEFAULT_COURSE_API: &str = "http://localhost:8081/api";

/// Course service client (`/courses`, `/courses/{id}`, `/courses/{id}/lessons/{lesson}`).
#[derive(Debug, Clone)]
pub struct HttpCourseStore {
    client: Client,
    base: String,
}

impl HttpCourseStore {
    pub fn new(base: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base = base.into().trim_end_matches('/').to_string();
        Ok(Self { client, base })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let base = cfg
            .get("COURSE_API_URL")
            .unwrap_or_else(|| DEFAULT_COURSE_API.to_string());
        Self::new(base, cfg.request_timeout())
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, what: String) -> Result<T, StoreError> {
        let url = format!("{}{}", self.base, path);
        log::debug!("GET {}", url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        match resp.status() {
            status if status.is_success() => resp
                .json::<T>()
                .await
                .map_err(|e| StoreError::Malformed(e.to_string())),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(what)),
            status => {
                log::warn!("course service returned {} for {}", status, url);
                Err(StoreError::Transport(format!("HTTP {}", status)))
            }
        }
    }
}

#[async_trait]
impl CourseStore for HttpCourseStore {
    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        self.fetch("/courses", "courses".into()).await
    }

    async fn get_course(&self, course_id: &str) -> Result<CourseDetail, StoreError> {
        let path = format!("/courses/{}", urlencoding::encode(course_id));
        let mut detail: CourseDetail = self.fetch(&path, format!("course '{}'", course_id)).await?;
        detail.lessons.sort_by_key(|l| l.order);
        Ok(detail)
    }

    async fn get_lesson(&self, course_id: &str, lesson_id: &str) -> Result<Lesson, StoreError> {
        let path = format!(
            "/courses/{}/lessons/{}",
            urlencoding::encode(course_id),
            urlencoding::encode(lesson_id)
        );
        self.fetch(&path, format!("lesson '{}'", lesson_id)).await
    }
}
