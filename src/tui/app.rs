//! TUI application state management.

use std::time::{Duration, Instant};

use crate::navigation::{LessonNavigator, LessonPage};

use super::editor::Editor;

/// Which pane receives plain keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Editor,
    /// Lesson sidebar, with the highlighted row.
    Lessons(usize),
}

const DOUBLE_CTRL_C_TIMEOUT: Duration = Duration::from_millis(800);

pub struct App {
    pub nav: LessonNavigator,
    pub editor: Editor,
    pub focus: Focus,
    pub show_help: bool,
    /// Scroll offset of the lesson content pane, in lines.
    pub content_scroll: u16,
    pub status_message: String,
    /// Timestamp of last Ctrl+C press for double Ctrl+C detection
    pub last_ctrl_c_time: Option<Instant>,
    /// Active lesson the editor state belongs to.
    editor_lesson: Option<String>,
}

impl App {
    pub fn new(nav: LessonNavigator) -> Self {
        Self {
            nav,
            editor: Editor::default(),
            focus: Focus::Editor,
            show_help: false,
            content_scroll: 0,
            status_message: default_status().to_string(),
            last_ctrl_c_time: None,
            editor_lesson: None,
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Reset per-lesson view state once a different lesson has loaded.
    pub fn sync_lesson(&mut self) {
        let loaded = self.nav.active_lesson().map(|l| l.id.clone());
        if loaded.is_some() && loaded != self.editor_lesson {
            self.editor.reset();
            self.content_scroll = 0;
            self.editor_lesson = loaded;
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Editor => Focus::Lessons(self.nav.active_index().unwrap_or(0)),
            Focus::Lessons(_) => Focus::Editor,
        };
    }

    pub fn highlight_up(&mut self) {
        if let Focus::Lessons(i) = self.focus {
            self.focus = Focus::Lessons(i.saturating_sub(1));
        }
    }

    pub fn highlight_down(&mut self) {
        if let Focus::Lessons(i) = self.focus {
            let last = self.nav.course().lessons.len().saturating_sub(1);
            self.focus = Focus::Lessons((i + 1).min(last));
        }
    }

    pub fn open_highlighted(&mut self) {
        if let Focus::Lessons(i) = self.focus {
            let id = self.nav.course().lessons.get(i).map(|l| l.id.clone());
            if let Some(id) = id {
                self.nav.select_lesson(&id);
            }
            self.focus = Focus::Editor;
        }
    }

    pub fn run(&mut self) {
        if self.nav.session().is_running() {
            self.status_message = "Already running".into();
        } else if self.nav.page() != &LessonPage::Ready {
            self.status_message = "Lesson is not loaded".into();
        } else {
            self.nav.run();
            self.status_message = default_status().into();
        }
    }

    pub fn scroll_content_up(&mut self) {
        self.content_scroll = self.content_scroll.saturating_sub(5);
    }

    pub fn scroll_content_down(&mut self) {
        self.content_scroll = self.content_scroll.saturating_add(5);
    }

    /// Returns true on the second press within the timeout.
    pub fn handle_ctrl_c(&mut self) -> bool {
        let now = Instant::now();
        if let Some(last_time) = self.last_ctrl_c_time {
            if now.duration_since(last_time) <= DOUBLE_CTRL_C_TIMEOUT {
                self.last_ctrl_c_time = None;
                return true;
            }
        }
        self.last_ctrl_c_time = Some(now);
        self.status_message = "Press Ctrl+C again to quit".into();
        false
    }

    /// Source editing goes straight to the session buffer.
    pub fn edit(&mut self, f: impl FnOnce(&mut Editor, &mut String)) {
        let source = self.nav.session_mut().source_mut();
        f(&mut self.editor, source);
    }
}

fn default_status() -> &'static str {
    "Ctrl+R run | Ctrl+N/P lesson | F2 hints | F1 help"
}
