//! Course browser and Go code runner: lesson navigation, execution sessions
//! and the backends that actually run learner code.

pub mod config;
pub mod course;
pub mod events;
pub mod execution;
pub mod locator;
pub mod navigation;
pub mod printer;
pub mod process;
pub mod reconcile;
pub mod session;
pub mod tui;
pub mod utils;

pub use events::CoreEvent;
pub use locator::Locator;
pub use navigation::LessonNavigator;
pub use reconcile::{reconcile, Verdict};
pub use session::{ExecutionSession, RunState};
