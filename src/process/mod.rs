//! Runner process management: staging, startup and incremental stdio capture.

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, ChildStdout, Command};

use crate::config::Config;
use crate::execution::sandbox::{ExitReport, ModuleImage, OutputCallbacks, SandboxError, SandboxRuntime};

pub const DEFAULT_RUNNER: &str = "wasmtime run {module}";
const MODULE_PLACEHOLDER: &str = "{module}";

/// Runs staged modules through an external WebAssembly runner.
#[derive(Debug, Clone)]
pub struct ProcessRuntime {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessRuntime {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self { program: program.into(), args, timeout }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let line = cfg
            .get("SANDBOX_RUNNER")
            .unwrap_or_else(|| DEFAULT_RUNNER.to_string());
        let (program, args) = parse_command(&line)?;
        Ok(Self::new(program, args, cfg.request_timeout()))
    }

    fn args_for(&self, module_path: &str) -> Vec<String> {
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(MODULE_PLACEHOLDER, module_path))
            .collect();
        if !self.args.iter().any(|a| a.contains(MODULE_PLACEHOLDER)) {
            args.push(module_path.to_string());
        }
        args
    }
}

/// Split a runner command line on whitespace into program and arguments.
pub fn parse_command(line: &str) -> Result<(String, Vec<String>)> {
    let mut parts = line.split_whitespace().map(str::to_string);
    match parts.next() {
        Some(program) => Ok((program, parts.collect())),
        None => bail!("SANDBOX_RUNNER is empty"),
    }
}

#[async_trait]
impl SandboxRuntime for ProcessRuntime {
    async fn execute(
        &self,
        module: ModuleImage,
        callbacks: OutputCallbacks,
    ) -> Result<ExitReport, SandboxError> {
        let mut staged = tempfile::Builder::new()
            .prefix("golearn-")
            .suffix(".wasm")
            .tempfile()?;
        staged.write_all(&module.bytes)?;
        staged.flush()?;
        let module_path = staged.path().to_string_lossy().into_owned();

        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(&module_path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| SandboxError::Spawn(format!("{}: {}", self.program, e)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SandboxError::Spawn("no stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SandboxError::Spawn("no stderr".into()))?;

        let waited = tokio::time::timeout(self.timeout, async {
            pump_output(stdout, stderr, &callbacks).await?;
            child.wait().await.map_err(SandboxError::from)
        })
        .await;

        match waited {
            Ok(status) => Ok(ExitReport { code: status?.code() }),
            Err(_) => {
                let _ = child.kill().await;
                Err(SandboxError::Timeout(self.timeout))
            }
        }
    }
}

/// Read both pipes until EOF, handing the whole transcript so far to the
/// callback of whichever stream produced the chunk.
async fn pump_output(
    mut stdout: ChildStdout,
    mut stderr: ChildStderr,
    callbacks: &OutputCallbacks,
) -> Result<(), SandboxError> {
    let mut transcript: Vec<u8> = Vec::new();
    let mut out_buf = [0u8; 4096];
    let mut err_buf = [0u8; 4096];
    let (mut out_open, mut err_open) = (true, true);

    while out_open || err_open {
        tokio::select! {
            read = stdout.read(&mut out_buf), if out_open => {
                let n = read?;
                if n == 0 {
                    out_open = false;
                } else {
                    transcript.extend_from_slice(&out_buf[..n]);
                    (callbacks.on_stdout)(&String::from_utf8_lossy(&transcript));
                }
            }
            read = stderr.read(&mut err_buf), if err_open => {
                let n = read?;
                if n == 0 {
                    err_open = false;
                } else {
                    transcript.extend_from_slice(&err_buf[..n]);
                    (callbacks.on_stderr)(&String::from_utf8_lossy(&transcript));
                }
            }
        }
    }
    Ok(())
}
