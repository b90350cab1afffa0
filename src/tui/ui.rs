//! UI layout and rendering logic for the TUI.

use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::app::{App, Focus};
use super::editor::{display_column, TAB_WIDTH};
use crate::navigation::{LessonNavigator, LessonPage};
use crate::reconcile::Verdict;
use crate::session::RunState;
use crate::utils::truncate_display;

/// Render the main UI
pub fn render_ui(frame: &mut Frame, app: &mut App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Panes
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(30)])
        .split(main_layout[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(columns[1]);

    let work = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);

    render_sidebar(frame, app, columns[0]);
    render_lesson_area(frame, app, rows[0]);
    render_editor(frame, app, work[0]);
    render_output(frame, &app.nav, work[1]);
    render_status_bar(frame, app, main_layout[1]);

    if app.show_help {
        render_help_overlay(frame);
    }
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let highlighted = match app.focus {
        Focus::Lessons(i) => Some(i),
        Focus::Editor => None,
    };
    let width = area.width.saturating_sub(6) as usize;

    let lines: Vec<Line> = app
        .nav
        .lessons()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let (marker, marker_style) = if entry.completed {
                ("✓", Style::default().fg(Color::Green))
            } else if entry.active {
                ("●", Style::default().fg(Color::Cyan))
            } else {
                ("—", Style::default().fg(Color::DarkGray))
            };
            let mut style = if entry.active {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            if highlighted == Some(i) {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(vec![
                Span::styled(format!(" {} ", marker), marker_style),
                Span::styled(truncate_display(&entry.summary.title, width), style),
            ])
        })
        .collect();

    let (done, total) = app.nav.progress();
    let title = format!("Lessons {}/{}", done, total);
    let border = if highlighted.is_some() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let paragraph = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title),
    );
    frame.render_widget(paragraph, area);
}

fn render_lesson_area(frame: &mut Frame, app: &App, area: Rect) {
    let nav = &app.nav;
    let hints_open = nav.hints().hints_visible || nav.hints().answer_visible;
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(if hints_open {
            [Constraint::Min(3), Constraint::Length(7)]
        } else {
            [Constraint::Min(3), Constraint::Length(0)]
        })
        .split(area);

    let title = nav
        .active_lesson()
        .map(|l| l.title.clone())
        .unwrap_or_else(|| nav.course().course.title.clone());

    let body = match nav.page() {
        LessonPage::Ready => nav
            .active_lesson()
            .map(|l| markdown_lines(&l.content))
            .unwrap_or_default(),
        LessonPage::Loading => vec![Line::from("Loading lesson...")],
        LessonPage::Empty => vec![Line::from("This course has no lessons yet.")],
        LessonPage::NotFound(what) => vec![Line::styled(
            format!("Not found: {}", what),
            Style::default().fg(Color::Red),
        )],
        LessonPage::Failed(msg) => vec![
            Line::styled(format!("Failed to load lesson: {}", msg), Style::default().fg(Color::Red)),
            Line::from("Press F6 to retry."),
        ],
    };

    let paragraph = Paragraph::new(Text::from(body))
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((app.content_scroll, 0));
    frame.render_widget(paragraph, layout[0]);

    if hints_open {
        render_hints(frame, nav, layout[1]);
    }
}

/// Light markdown styling: headings and fenced code stand out.
fn markdown_lines(content: &str) -> Vec<Line<'static>> {
    let mut in_code = false;
    let mut lines = Vec::new();
    for raw in content.lines() {
        if raw.trim_start().starts_with("```") {
            in_code = !in_code;
            continue;
        }
        let line = if in_code {
            Line::styled(format!("  {}", raw.replace('\t', "    ")), Style::default().fg(Color::Cyan))
        } else if raw.starts_with('#') {
            Line::styled(
                raw.trim_start_matches('#').trim().to_string(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )
        } else {
            Line::from(raw.to_string())
        };
        lines.push(line);
    }
    lines
}

fn render_hints(frame: &mut Frame, nav: &LessonNavigator, area: Rect) {
    let mut lines = Vec::new();
    if nav.hints().hints_visible {
        match nav.current_hint() {
            Some(hint) => {
                lines.push(Line::styled(
                    format!("Hint {}/{}", nav.hints().cursor + 1, nav.hint_count()),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ));
                lines.push(Line::from(hint.to_string()));
            }
            None => lines.push(Line::from("No hints for this lesson.")),
        }
    }
    if nav.hints().answer_visible {
        lines.push(Line::styled(
            "Expected output:",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
        match nav.expected_output() {
            Some(expected) => lines.extend(expected.lines().map(|l| Line::from(l.to_string()))),
            None => lines.push(Line::from("(none)")),
        }
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Hints (F3/F4)"))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_editor(frame: &mut Frame, app: &mut App, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let focused = app.focus == Focus::Editor;
    let source = app.nav.session().source().to_string();
    app.editor.follow(&source, height);

    let lines: Vec<Line> = source
        .split('\n')
        .skip(app.editor.scroll)
        .take(height)
        .map(|l| Line::from(l.replace('\t', &" ".repeat(TAB_WIDTH))))
        .collect();

    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let paragraph = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title("Code (Ctrl+R run)"),
    );
    frame.render_widget(paragraph, area);

    if focused && !app.show_help {
        let (row, col) = app.editor.position(&source);
        let line = source.split('\n').nth(row).unwrap_or("");
        let x = area.x + 1 + display_column(line, col) as u16;
        let y = area.y + 1 + (row - app.editor.scroll) as u16;
        if x < area.right().saturating_sub(1) && y < area.bottom().saturating_sub(1) {
            frame.set_cursor_position(Position::new(x, y));
        }
    }
}

fn render_output(frame: &mut Frame, nav: &LessonNavigator, area: Rect) {
    let session = nav.session();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let mut lines: Vec<Line> = session
        .output()
        .lines()
        .map(|l| Line::from(l.to_string()))
        .collect();
    if let Some(err) = session.error() {
        lines.push(Line::styled(
            format!("Error: {}", err),
            Style::default().fg(Color::Red),
        ));
    }
    if lines.is_empty() && session.is_running() {
        lines.push(Line::styled("Running...", Style::default().fg(Color::DarkGray)));
    }

    let title = match session.state() {
        RunState::Running => "Output (running)",
        RunState::Errored => "Output (error)",
        RunState::Idle => "Output",
    };

    // Keep the newest output in view
    let available_height = layout[0].height.saturating_sub(2) as usize;
    let total_lines = lines.len();
    let mut paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title));
    if total_lines > available_height {
        paragraph = paragraph.scroll(((total_lines - available_height) as u16, 0));
    }
    frame.render_widget(paragraph, layout[0]);

    let verdict = nav.verdict();
    let color = match verdict {
        Verdict::Match => Color::Green,
        Verdict::Mismatch => Color::Red,
        Verdict::NotApplicable => Color::DarkGray,
    };
    let line = Line::from(vec![
        Span::raw(" Verdict: "),
        Span::styled(verdict.label(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ]);
    frame.render_widget(Paragraph::new(line), layout[1]);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.nav.session();
    let status_text = format!(
        " {} | {} | {} | {}",
        app.nav.locator(),
        session.backend_name(),
        session.state().label(),
        app.status_message
    );
    let status_paragraph =
        Paragraph::new(status_text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(status_paragraph, area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame) {
    let area = frame.area();
    let popup_area = centered_rect(70, 70, area);
    frame.render_widget(Clear, popup_area);

    let help_lines = vec![
        Line::from("Lessons:"),
        Line::from("  Ctrl+N / Ctrl+P - Next / previous lesson"),
        Line::from("  Esc             - Switch between editor and lesson list"),
        Line::from("  ↑/↓, Enter      - Pick a lesson from the list"),
        Line::from("  PgUp/PgDn       - Scroll lesson text"),
        Line::from("  F6              - Retry loading the lesson"),
        Line::from(""),
        Line::from("Code:"),
        Line::from("  Ctrl+R          - Run"),
        Line::from("  Ctrl+L          - Clear output"),
        Line::from(""),
        Line::from("Hints:"),
        Line::from("  F2              - Show / hide hints"),
        Line::from("  F3 / F4         - Next / previous hint"),
        Line::from("  F5              - Show / hide expected output"),
        Line::from(""),
        Line::from("  F1              - Toggle this help"),
        Line::from("  Ctrl+C twice    - Quit"),
    ];

    let help_paragraph = Paragraph::new(Text::from(help_lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .title_style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(help_paragraph, popup_area);
}

/// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_headings_and_fences() {
        let lines = markdown_lines("# Title\ntext\n```go\n\tfmt.Println()\n```");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].to_string(), "Title");
        assert_eq!(lines[2].to_string(), "      fmt.Println()");
    }

    #[test]
    fn centered_rect_is_inside() {
        let outer = Rect::new(0, 0, 100, 50);
        let inner = centered_rect(70, 70, outer);
        assert!(inner.x > 0 && inner.right() < 100);
        assert!(inner.y > 0 && inner.bottom() < 50);
    }
}
