//! Completions delivered back to the single owner loop by background tasks.

use crate::course::{Lesson, StoreError};
use crate::execution::ExecutionOutcome;
use crate::navigation::LessonTicket;
use crate::session::RunTicket;

/// Every event carries the ticket of the request that produced it, so the
/// owner can tell a superseded response from a current one.
#[derive(Debug)]
pub enum CoreEvent {
    /// Cumulative output so far from a streaming backend.
    RunProgress { ticket: RunTicket, output: String },
    RunFinished { ticket: RunTicket, outcome: ExecutionOutcome },
    LessonLoaded {
        ticket: LessonTicket,
        result: Result<Lesson, StoreError>,
    },
}
