//! Sandboxed local strategy: replays a precompiled module for a known example.
//!
//! The submitted source is not compiled here. The module is chosen by example
//! id, so edits in the editor do not change what executes; the remote
//! strategy is the one that compiles user text.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use super::examples::DEFAULT_EXAMPLE;
use super::{ExecutionBackend, ExecutionError, ExecutionOutcome, ProgressFn, RunRequest};
use crate::config::Config;
use crate::process::ProcessRuntime;

const WASM_MAGIC: &[u8] = b"\0asm";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Output hooks registered with a runtime; each receives the cumulative
/// transcript captured so far, not the delta.
pub struct OutputCallbacks {
    pub on_stdout: Box<dyn Fn(&str) + Send + Sync>,
    pub on_stderr: Box<dyn Fn(&str) + Send + Sync>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    /// `None` when the module was terminated by a signal.
    pub code: Option<i32>,
}

impl ExitReport {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("failed to start sandbox runner: {0}")]
    Spawn(String),
    #[error("execution timed out after {0:?}")]
    Timeout(Duration),
    #[error("sandbox i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runtime able to instantiate a module with intercepted stdio.
#[async_trait]
pub trait SandboxRuntime: Send + Sync {
    async fn execute(
        &self,
        module: ModuleImage,
        callbacks: OutputCallbacks,
    ) -> Result<ExitReport, SandboxError>;
}

/// Maps example ids to `<dir>/<id>.wasm`.
#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    dir: PathBuf,
    default_example: String,
}

impl ModuleCatalog {
    pub fn new(dir: impl Into<PathBuf>, default_example: impl Into<String>) -> Self {
        Self { dir: dir.into(), default_example: default_example.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Module path for `example`, falling back to the default example when
    /// the id is unknown or not a plain name.
    pub fn resolve(&self, example: Option<&str>) -> PathBuf {
        let candidate = example
            .filter(|id| is_plain_name(id))
            .map(|id| self.dir.join(format!("{}.wasm", id)))
            .filter(|p| p.is_file());
        candidate.unwrap_or_else(|| self.dir.join(format!("{}.wasm", self.default_example)))
    }

    pub async fn load(&self, example: Option<&str>) -> Result<ModuleImage, ExecutionError> {
        let path = self.resolve(example);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            ExecutionError::Transport(format!("failed to load module {}: {}", path.display(), e))
        })?;
        if !bytes.starts_with(WASM_MAGIC) {
            return Err(ExecutionError::Transport(format!(
                "failed to load module {}: not a WebAssembly binary",
                path.display()
            )));
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(ModuleImage { name, bytes })
    }
}

fn is_plain_name(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub struct SandboxBackend {
    catalog: ModuleCatalog,
    runtime: Arc<dyn SandboxRuntime>,
}

impl SandboxBackend {
    pub fn new(catalog: ModuleCatalog, runtime: Arc<dyn SandboxRuntime>) -> Self {
        Self { catalog, runtime }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let dir = cfg
            .get_path("SANDBOX_MODULE_DIR")
            .unwrap_or_else(|| PathBuf::from("modules"));
        let default_example = cfg
            .get("SANDBOX_DEFAULT_EXAMPLE")
            .unwrap_or_else(|| DEFAULT_EXAMPLE.to_string());
        let runtime = ProcessRuntime::from_config(cfg)?;
        Ok(Self::new(ModuleCatalog::new(dir, default_example), Arc::new(runtime)))
    }
}

#[async_trait]
impl ExecutionBackend for SandboxBackend {
    fn name(&self) -> &'static str {
        "sandbox"
    }

    fn streams_output(&self) -> bool {
        true
    }

    async fn run(&self, request: RunRequest, progress: Option<ProgressFn>) -> ExecutionOutcome {
        if request.is_empty() {
            return ExecutionOutcome::failure(ExecutionError::Validation);
        }
        let module = match self.catalog.load(request.example.as_deref()).await {
            Ok(module) => module,
            Err(err) => {
                log::warn!("{}", err);
                return ExecutionOutcome::failure(err);
            }
        };
        log::debug!("replaying precompiled module '{}' ({} bytes)", module.name, module.bytes.len());

        let last = Arc::new(Mutex::new(String::new()));
        let deliver: Arc<dyn Fn(&str) + Send + Sync> = {
            let last = last.clone();
            Arc::new(move |text: &str| {
                *last.lock().unwrap_or_else(|e| e.into_inner()) = text.to_string();
                if let Some(progress) = progress.as_ref() {
                    progress(text);
                }
            })
        };
        let callbacks = OutputCallbacks {
            on_stdout: {
                let deliver = deliver.clone();
                Box::new(move |text: &str| deliver(text))
            },
            on_stderr: Box::new(move |text: &str| deliver(text)),
        };

        let result = self.runtime.execute(module, callbacks).await;
        let output = last.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match result {
            Ok(report) if report.success() => ExecutionOutcome::success(output),
            Ok(report) => {
                let status = report
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                ExecutionOutcome {
                    output,
                    error: Some(ExecutionError::Program(format!("process exited with status {}", status))),
                }
            }
            Err(err) => {
                log::warn!("sandbox run failed: {}", err);
                ExecutionOutcome { output, error: Some(ExecutionError::Transport(err.to_string())) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedRuntime {
        chunks: Vec<&'static str>,
        exit: Option<i32>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SandboxRuntime for ScriptedRuntime {
        async fn execute(
            &self,
            _module: ModuleImage,
            callbacks: OutputCallbacks,
        ) -> Result<ExitReport, SandboxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut transcript = String::new();
            for (i, chunk) in self.chunks.iter().enumerate() {
                transcript.push_str(chunk);
                if i % 2 == 0 {
                    (callbacks.on_stdout)(&transcript);
                } else {
                    (callbacks.on_stderr)(&transcript);
                }
            }
            Ok(ExitReport { code: self.exit })
        }
    }

    fn module_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.wasm"), b"\0asm\x01\0\0\0").unwrap();
        std::fs::write(dir.path().join("broken.wasm"), b"not wasm").unwrap();
        dir
    }

    fn scripted_backend(dir: &Path, chunks: Vec<&'static str>, exit: Option<i32>) -> (SandboxBackend, Arc<ScriptedRuntime>) {
        let runtime = Arc::new(ScriptedRuntime { chunks, exit, calls: AtomicUsize::new(0) });
        let backend = SandboxBackend::new(ModuleCatalog::new(dir, "hello"), runtime.clone());
        (backend, runtime)
    }

    #[tokio::test]
    async fn progress_receives_cumulative_output() {
        let dir = module_dir();
        let (backend, _) = scripted_backend(dir.path(), vec!["Count: 1\n", "Count: 2\n", "Done!\n"], Some(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Box::new(move |text: &str| sink.lock().unwrap().push(text.to_string()));

        let outcome = backend.run(RunRequest::new("package main"), Some(progress)).await;

        assert_eq!(outcome, ExecutionOutcome::success("Count: 1\nCount: 2\nDone!\n"));
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Count: 1\n", "Count: 1\nCount: 2\n", "Count: 1\nCount: 2\nDone!\n"]
        );
    }

    #[tokio::test]
    async fn empty_source_never_loads_a_module() {
        let dir = module_dir();
        let (backend, runtime) = scripted_backend(dir.path(), vec!["x"], Some(0));
        let outcome = backend.run(RunRequest::new("  \n"), None).await;
        assert_eq!(outcome.error, Some(ExecutionError::Validation));
        assert_eq!(runtime.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_example_falls_back_to_default_module() {
        let dir = module_dir();
        let catalog = ModuleCatalog::new(dir.path(), "hello");
        assert_eq!(catalog.resolve(Some("maps")), dir.path().join("hello.wasm"));
        assert_eq!(catalog.resolve(Some("../etc/passwd")), dir.path().join("hello.wasm"));
        assert_eq!(catalog.resolve(Some("broken")), dir.path().join("broken.wasm"));
    }

    #[tokio::test]
    async fn invalid_module_is_a_load_failure() {
        let dir = module_dir();
        let (backend, runtime) = scripted_backend(dir.path(), vec![], Some(0));
        let outcome = backend
            .run(RunRequest::new("package main").with_example("broken"), None)
            .await;
        assert!(matches!(outcome.error, Some(ExecutionError::Transport(_))));
        assert_eq!(runtime.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_zero_exit_keeps_captured_output() {
        let dir = module_dir();
        let (backend, _) = scripted_backend(dir.path(), vec!["partial\n", "panic: boom\n"], Some(2));
        let outcome = backend.run(RunRequest::new("package main"), None).await;
        assert_eq!(outcome.output, "partial\npanic: boom\n");
        assert_eq!(
            outcome.error,
            Some(ExecutionError::Program("process exited with status 2".into()))
        );
    }
}
