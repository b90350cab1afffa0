//! Execution session: one editable source buffer, at most one run in flight.
//!
//! The session never awaits the backend itself. `run` spawns the call and
//! the owner feeds the resulting [`CoreEvent`]s back through
//! [`ExecutionSession::apply_progress`] and [`ExecutionSession::apply_finished`].
//! Each run is stamped with a [`RunTicket`]; `clear` and `reset` bump the
//! generation so anything still in flight is dropped on arrival.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

use crate::events::CoreEvent;
use crate::execution::{ExecutionBackend, ExecutionError, ExecutionOutcome, ProgressFn, RunRequest};
use crate::reconcile::{reconcile, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Errored,
}

impl RunState {
    pub fn label(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Errored => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    generation: u64,
    run: u64,
}

pub struct ExecutionSession {
    backend: Arc<dyn ExecutionBackend>,
    events: UnboundedSender<CoreEvent>,
    source: String,
    example: Option<String>,
    state: RunState,
    output: String,
    error: Option<ExecutionError>,
    generation: u64,
    runs: u64,
    output_tx: watch::Sender<String>,
}

impl ExecutionSession {
    pub fn new(backend: Arc<dyn ExecutionBackend>, events: UnboundedSender<CoreEvent>) -> Self {
        let (output_tx, _) = watch::channel(String::new());
        Self {
            backend,
            events,
            source: String::new(),
            example: None,
            state: RunState::Idle,
            output: String::new(),
            error: None,
            generation: 0,
            runs: 0,
            output_tx,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    pub fn source_mut(&mut self) -> &mut String {
        &mut self.source
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn error(&self) -> Option<&ExecutionError> {
        self.error.as_ref()
    }

    /// Output as it changes. Every change replaces the whole text, and
    /// `clear`/`reset` publish the empty string.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.output_tx.subscribe()
    }

    pub fn verdict(&self, expected: Option<&str>) -> Verdict {
        reconcile(Some(&self.output), expected)
    }

    /// Load a new starter, forgetting output, error and any run in flight.
    pub fn reset(&mut self, starter: &str, example: Option<String>) {
        self.source = starter.to_string();
        self.example = example;
        self.clear();
    }

    /// Clear output and error. A run still in flight becomes stale.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.state = RunState::Idle;
        self.error = None;
        self.set_output(String::new());
    }

    /// Start a run of the current source. Returns whether a backend call was
    /// dispatched; a second request while one is running is ignored.
    pub fn run(&mut self) -> bool {
        if self.is_running() {
            log::debug!("run ignored: already running");
            return false;
        }
        self.error = None;
        if self.source.trim().is_empty() {
            self.state = RunState::Errored;
            self.error = Some(ExecutionError::Validation);
            return false;
        }

        self.runs += 1;
        let ticket = RunTicket { generation: self.generation, run: self.runs };
        self.state = RunState::Running;
        self.set_output(String::new());

        let mut request = RunRequest::new(self.source.clone());
        request.example = self.example.clone();
        let backend = self.backend.clone();
        let events = self.events.clone();
        let progress: Option<ProgressFn> = if backend.streams_output() {
            let events = events.clone();
            Some(Box::new(move |text: &str| {
                let _ = events.send(CoreEvent::RunProgress { ticket, output: text.to_string() });
            }))
        } else {
            None
        };

        log::debug!("dispatching run {} to {}", ticket.run, backend.name());
        tokio::spawn(async move {
            let outcome = backend.run(request, progress).await;
            if events.send(CoreEvent::RunFinished { ticket, outcome }).is_err() {
                log::debug!("run {} finished after the owner went away", ticket.run);
            }
        });
        true
    }

    pub fn apply_progress(&mut self, ticket: RunTicket, output: String) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.set_output(output);
        true
    }

    pub fn apply_finished(&mut self, ticket: RunTicket, outcome: ExecutionOutcome) -> bool {
        if !self.is_current(ticket) {
            log::debug!("dropping stale result of run {}", ticket.run);
            return false;
        }
        match outcome.error {
            Some(err) => {
                log::info!("run {} failed: {}", ticket.run, err);
                self.state = RunState::Errored;
                self.error = Some(err);
                if !outcome.output.is_empty() {
                    self.set_output(outcome.output);
                }
            }
            None => {
                self.state = RunState::Idle;
                self.set_output(outcome.output);
            }
        }
        true
    }

    fn is_current(&self, ticket: RunTicket) -> bool {
        self.is_running() && ticket.generation == self.generation && ticket.run == self.runs
    }

    fn set_output(&mut self, output: String) {
        self.output = output;
        self.output_tx.send_replace(self.output.clone());
    }
}
