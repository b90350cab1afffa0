use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ExecutionBackend, ExecutionOutcome, ProgressFn, RunRequest};

/// Backend double that replays a fixed outcome, optionally streaming
/// cumulative chunks first.
pub(crate) struct FakeBackend {
    outcome: ExecutionOutcome,
    chunks: Vec<String>,
    calls: AtomicUsize,
    last_request: Mutex<Option<RunRequest>>,
}

impl FakeBackend {
    pub fn replying(outcome: ExecutionOutcome) -> Arc<Self> {
        Self::streaming(Vec::new(), outcome)
    }

    pub fn streaming(chunks: Vec<&str>, outcome: ExecutionOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            chunks: chunks.into_iter().map(str::to_string).collect(),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<RunRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn streams_output(&self) -> bool {
        !self.chunks.is_empty()
    }

    async fn run(&self, request: RunRequest, progress: Option<ProgressFn>) -> ExecutionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        if let Some(progress) = progress {
            let mut transcript = String::new();
            for chunk in &self.chunks {
                transcript.push_str(chunk);
                progress(&transcript);
            }
        }
        self.outcome.clone()
    }
}
