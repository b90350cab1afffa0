//! Async event loop for the interactive lesson view.

use std::io::{self, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use tokio::sync::mpsc;

use super::{
    app::{App, Focus},
    events::TuiEvent,
    ui::render_ui,
};
use crate::events::CoreEvent;
use crate::locator::Locator;
use crate::navigation::LessonNavigator;

/// Run the lesson view until the user quits; returns where they left off.
pub async fn run_learn_tui(
    nav: LessonNavigator,
    core_rx: mpsc::UnboundedReceiver<CoreEvent>,
) -> Result<Locator> {
    if !io::stdout().is_terminal() {
        bail!("TUI mode requires a proper terminal environment");
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(nav);
    let result = run_app(&mut terminal, &mut app, core_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    terminal.backend_mut().execute(DisableBracketedPaste)?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result.map(|_| app.nav.locator().clone())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    mut core_rx: mpsc::UnboundedReceiver<CoreEvent>,
) -> Result<()> {
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<TuiEvent>();
    let stop = Arc::new(AtomicBool::new(false));
    let reader_stop = stop.clone();
    tokio::task::spawn_blocking(move || {
        while !reader_stop.load(Ordering::Relaxed) {
            if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                let Ok(raw) = event::read() else { continue };
                if let Some(ev) = TuiEvent::from_terminal(raw) {
                    if input_tx.send(ev).is_err() {
                        break; // Channel closed
                    }
                }
            }
        }
    });

    let result = loop {
        app.sync_lesson();
        if let Err(e) = terminal.draw(|frame| render_ui(frame, app)) {
            break Err(e.into());
        }

        tokio::select! {
            Some(event) = input_rx.recv() => {
                if handle_tui_event(app, event) {
                    break Ok(());
                }
            }
            Some(event) = core_rx.recv() => {
                app.nav.apply(event);
            }
            else => break Ok(()),
        }
    };

    stop.store(true, Ordering::Relaxed);
    result
}

/// Returns true when the user asked to quit.
fn handle_tui_event(app: &mut App, event: TuiEvent) -> bool {
    match event {
        TuiEvent::Key(key) => handle_key_event(app, key),
        TuiEvent::Paste(text) => {
            if app.focus == Focus::Editor {
                app.edit(|ed, src| ed.insert_str(src, &text));
            }
            false
        }
        TuiEvent::Resize => false,
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if app.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::F(1)) {
            app.toggle_help();
        }
        if !(ctrl && key.code == KeyCode::Char('c')) {
            return false;
        }
    }

    match key.code {
        KeyCode::Char('c') if ctrl => return app.handle_ctrl_c(),
        KeyCode::Char('r') if ctrl => app.run(),
        KeyCode::Char('l') if ctrl => app.nav.clear_output(),
        KeyCode::Char('n') if ctrl => {
            app.nav.go_next();
        }
        KeyCode::Char('p') if ctrl => {
            app.nav.go_previous();
        }
        KeyCode::F(1) => app.toggle_help(),
        KeyCode::F(2) => app.nav.show_hints(),
        KeyCode::F(3) => app.nav.next_hint(),
        KeyCode::F(4) => app.nav.previous_hint(),
        KeyCode::F(5) => app.nav.toggle_answer(),
        KeyCode::F(6) => {
            app.nav.reload();
        }
        KeyCode::PageUp => app.scroll_content_up(),
        KeyCode::PageDown => app.scroll_content_down(),
        KeyCode::Esc => app.toggle_focus(),
        _ => match app.focus {
            Focus::Lessons(_) => handle_sidebar_key(app, key.code),
            Focus::Editor if !ctrl => handle_editor_key(app, key.code),
            Focus::Editor => {}
        },
    }
    false
}

fn handle_sidebar_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Up => app.highlight_up(),
        KeyCode::Down => app.highlight_down(),
        KeyCode::Enter => app.open_highlighted(),
        _ => {}
    }
}

fn handle_editor_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char(c) => app.edit(|ed, src| ed.insert_char(src, c)),
        KeyCode::Tab => app.edit(|ed, src| ed.insert_char(src, '\t')),
        KeyCode::Enter => app.edit(|ed, src| ed.newline(src)),
        KeyCode::Backspace => app.edit(|ed, src| ed.backspace(src)),
        KeyCode::Delete => app.edit(|ed, src| ed.delete(src)),
        KeyCode::Left => app.edit(|ed, _| ed.left()),
        KeyCode::Right => app.edit(|ed, src| ed.right(src)),
        KeyCode::Up => app.edit(|ed, src| ed.up(src)),
        KeyCode::Down => app.edit(|ed, src| ed.down(src)),
        KeyCode::Home => app.edit(|ed, src| ed.home(src)),
        KeyCode::End => app.edit(|ed, src| ed.end(src)),
        _ => {}
    }
}
