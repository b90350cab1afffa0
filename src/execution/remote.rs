//! Remote compile-and-run strategy.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{ExecutionBackend, ExecutionError, ExecutionOutcome, ProgressFn, RunRequest};
use crate::config::Config;

pub const DEFAULT_COMPILE_URL: &str = "http://localhost:8081/api/compile";
pub const PLAYGROUND_COMPILE_URL: &str = "https://play.golang.org/compile";

/// Wire dialect of the compile endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileApi {
    /// JSON `{"code"}` in, `{"output", "error"}` out.
    Service,
    /// Go playground form protocol, `{"Errors", "Events"}` out.
    Playground,
}

impl CompileApi {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "service" | "worker" => Ok(Self::Service),
            "playground" => Ok(Self::Playground),
            other => bail!("unknown COMPILE_API_FORMAT '{}'", other),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlaygroundResponse {
    #[serde(default)]
    errors: String,
    #[serde(default)]
    events: Option<Vec<PlaygroundEvent>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlaygroundEvent {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct RemoteCompileBackend {
    http: Client,
    url: String,
    api: CompileApi,
}

impl RemoteCompileBackend {
    pub fn new(url: impl Into<String>, api: CompileApi, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url: url.into(), api })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api = match cfg.get("COMPILE_API_FORMAT") {
            Some(s) => CompileApi::parse(&s)?,
            None => CompileApi::Service,
        };
        let url = cfg.get("COMPILE_API_URL").unwrap_or_else(|| match api {
            CompileApi::Service => DEFAULT_COMPILE_URL.to_string(),
            CompileApi::Playground => PLAYGROUND_COMPILE_URL.to_string(),
        });
        Self::new(url, api, cfg.request_timeout())
    }

    async fn submit(&self, source: &str) -> Result<ExecutionOutcome, ExecutionError> {
        let req = match self.api {
            CompileApi::Service => self
                .http
                .post(&self.url)
                .json(&serde_json::json!({ "code": source })),
            CompileApi::Playground => self
                .http
                .post(&self.url)
                .form(&[("body", source), ("version", "2")]),
        };

        let resp = req.send().await.map_err(|e| ExecutionError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ExecutionError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("request failed")
            )));
        }

        let outcome = match self.api {
            CompileApi::Service => {
                let body: ServiceResponse = resp
                    .json()
                    .await
                    .map_err(|e| ExecutionError::Transport(format!("invalid response: {}", e)))?;
                match body.error.filter(|e| !e.is_empty()) {
                    Some(err) => ExecutionOutcome::failure(ExecutionError::Program(err)),
                    None => ExecutionOutcome::success(body.output.unwrap_or_default()),
                }
            }
            CompileApi::Playground => {
                let body: PlaygroundResponse = resp
                    .json()
                    .await
                    .map_err(|e| ExecutionError::Transport(format!("invalid response: {}", e)))?;
                if body.errors.is_empty() {
                    let output: String = body
                        .events
                        .unwrap_or_default()
                        .into_iter()
                        .map(|e| e.message)
                        .collect();
                    ExecutionOutcome::success(output)
                } else {
                    ExecutionOutcome::failure(ExecutionError::Program(body.errors))
                }
            }
        };
        Ok(outcome)
    }
}

#[async_trait]
impl ExecutionBackend for RemoteCompileBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn run(&self, request: RunRequest, _progress: Option<ProgressFn>) -> ExecutionOutcome {
        if request.is_empty() {
            return ExecutionOutcome::failure(ExecutionError::Validation);
        }
        log::debug!("submitting {} bytes to {}", request.source.len(), self.url);
        match self.submit(&request.source).await {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("compile request failed: {}", err);
                ExecutionOutcome::failure(err)
            }
        }
    }
}
