//! Terminal input events forwarded from the blocking reader thread.

use crossterm::event::{Event, KeyEvent, KeyEventKind};

#[derive(Debug)]
pub enum TuiEvent {
    /// User keyboard input
    Key(KeyEvent),
    /// Bracketed paste content
    Paste(String),
    Resize,
}

impl TuiEvent {
    pub fn from_terminal(event: Event) -> Option<Self> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Some(TuiEvent::Key(key)),
            Event::Paste(text) => Some(TuiEvent::Paste(text)),
            Event::Resize(..) => Some(TuiEvent::Resize),
            _ => None,
        }
    }
}
