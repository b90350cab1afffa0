//! Execution engine: backend protocol, result types and strategy selection.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use thiserror::Error;

use crate::config::Config;

pub mod examples;
pub mod remote;
pub mod sandbox;

#[cfg(test)]
pub(crate) mod fake;

pub use remote::{CompileApi, RemoteCompileBackend};
pub use sandbox::{ModuleCatalog, SandboxBackend};

/// Errors a run can end with. Transport and program errors share the
/// session's single error slot but stay distinguishable here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("source code is required")]
    Validation,
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Program(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub source: String,
    /// Known example the source belongs to (lesson id for lessons).
    pub example: Option<String>,
}

impl RunRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into(), example: None }
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub output: String,
    pub error: Option<ExecutionError>,
}

impl ExecutionOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self { output: output.into(), error: None }
    }

    pub fn failure(error: ExecutionError) -> Self {
        Self { output: String::new(), error: Some(error) }
    }
}

/// Receives the cumulative output captured so far.
pub type ProgressFn = Box<dyn Fn(&str) + Send + Sync>;

#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `run` delivers intermediate output through `progress`.
    fn streams_output(&self) -> bool {
        false
    }

    /// Never fails past this boundary: every failure is folded into the outcome.
    async fn run(&self, request: RunRequest, progress: Option<ProgressFn>) -> ExecutionOutcome;
}

/// Build the strategy selected by `EXECUTION_BACKEND`.
pub fn from_config(cfg: &Config) -> Result<Arc<dyn ExecutionBackend>> {
    let kind = cfg
        .get("EXECUTION_BACKEND")
        .unwrap_or_else(|| "remote".into())
        .to_ascii_lowercase();
    let backend: Arc<dyn ExecutionBackend> = match kind.as_str() {
        "remote" => Arc::new(RemoteCompileBackend::from_config(cfg)?),
        "sandbox" | "local" => Arc::new(SandboxBackend::from_config(cfg)?),
        other => bail!("unknown EXECUTION_BACKEND '{}', expected remote or sandbox", other),
    };
    log::debug!("execution backend: {}", backend.name());
    Ok(backend)
}
