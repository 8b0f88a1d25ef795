//! UI layout and rendering logic for the TUI.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::app::App;
use crate::pad::{LayoutMode, RunState};

/// Render the main UI
pub fn render_ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Pad area
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    // The output panel only exists once a run has been triggered; in
    // Idle the editor has the whole pad area.
    if app.pad.state() == RunState::Idle {
        render_editor(frame, app, main_layout[0]);
    } else {
        let (direction, constraints) = match app.pad.layout() {
            LayoutMode::Stacked => (
                Direction::Vertical,
                [Constraint::Percentage(60), Constraint::Percentage(40)],
            ),
            LayoutMode::SideBySide => (
                Direction::Horizontal,
                [Constraint::Percentage(50), Constraint::Percentage(50)],
            ),
        };
        let pad_layout = Layout::default()
            .direction(direction)
            .constraints(constraints)
            .split(main_layout[0]);

        render_editor(frame, app, pad_layout[0]);
        render_output(frame, app, pad_layout[1]);
    }

    render_status_bar(frame, app, main_layout[1]);

    if app.show_help {
        render_help_overlay(frame);
    }
}

/// Render the source editor with a reverse-video cursor cell
fn render_editor(frame: &mut Frame, app: &App, area: Rect) {
    let (cursor_line, cursor_col) = app.pad.buffer().cursor();
    let cursor_style = Style::default().add_modifier(Modifier::REVERSED);

    let mut lines = Vec::new();
    let mut cursor_prefix_width = 0usize;
    for (i, raw) in app.pad.buffer().lines().iter().enumerate() {
        if i == cursor_line {
            let (before, at, after) = split_at_char(raw, cursor_col);
            cursor_prefix_width = before.width();
            let mut spans = vec![Span::raw(before.to_string())];
            if at.is_empty() {
                spans.push(Span::styled(" ", cursor_style));
            } else {
                spans.push(Span::styled(at.to_string(), cursor_style));
                spans.push(Span::raw(after.to_string()));
            }
            lines.push(Line::from(spans));
        } else {
            lines.push(Line::from(raw.as_str()));
        }
    }

    let title = format!("Editor - {}", app.source_title);

    // Keep the cursor visible: no wrapping, scroll the viewport instead
    let inner_height = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_y = cursor_line.saturating_sub(inner_height.saturating_sub(1));
    let scroll_x = cursor_prefix_width.saturating_sub(inner_width.saturating_sub(1));

    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((scroll_y as u16, scroll_x as u16));

    frame.render_widget(paragraph, area);
}

/// Render the output panel for the current run state
fn render_output(frame: &mut Frame, app: &App, area: Rect) {
    let mut content_lines = Vec::new();

    match app.pad.state() {
        RunState::Loading => {
            content_lines.push(Line::from(Span::styled(
                "Waiting for the interpreter...",
                Style::default().fg(Color::DarkGray),
            )));
        }
        RunState::Running => {
            content_lines.push(Line::from(Span::styled(
                "Running...",
                Style::default().fg(Color::DarkGray),
            )));
        }
        RunState::Completed => {
            if let Some(result) = app.pad.result() {
                for line in result.stdout.lines() {
                    content_lines.push(Line::from(line.to_string()));
                }
                let stderr_style = Style::default().fg(Color::Red);
                for line in result.stderr.lines() {
                    content_lines.push(Line::from(Span::styled(line.to_string(), stderr_style)));
                }
                if content_lines.is_empty() {
                    content_lines.push(Line::from(Span::styled(
                        "(no output)",
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
        }
        RunState::Idle => {}
    }

    // Clamp the scroll offset against the real content height
    let available_height = area.height.saturating_sub(2) as usize;
    let max_scroll = content_lines.len().saturating_sub(available_height);
    let scroll_y = app.output_scroll.min(max_scroll) as u16;

    let paragraph = Paragraph::new(Text::from(content_lines))
        .block(Block::default().borders(Borders::ALL).title("Output"))
        .wrap(Wrap { trim: false })
        .scroll((scroll_y, 0));

    frame.render_widget(paragraph, area);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_paragraph = Paragraph::new(app.status_message.clone())
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(status_paragraph, area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame) {
    let popup_area = centered_rect(70, 60, frame.area());

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let help_lines = vec![
        Line::from("Pad Help"),
        Line::from(""),
        Line::from("Run:"),
        Line::from("  Ctrl+R     - Run the buffer"),
        Line::from("  Ctrl+L     - Clear the output panel"),
        Line::from("  Ctrl+N     - Load a different random snippet"),
        Line::from(""),
        Line::from("Editing:"),
        Line::from("  Arrows     - Move the cursor"),
        Line::from("  Tab        - Insert four spaces"),
        Line::from("  Home/End   - Jump within the line"),
        Line::from(""),
        Line::from("Output:"),
        Line::from("  PgUp/PgDn  - Scroll the output panel"),
        Line::from(""),
        Line::from("  F1         - Toggle this help"),
        Line::from("  Ctrl+C     - Quit"),
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
    let vertical = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(r);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(vertical[1])[1]
}

/// Split `s` at the `col`-th character into (before, that char, after).
fn split_at_char(s: &str, col: usize) -> (&str, &str, &str) {
    let start = s
        .char_indices()
        .nth(col)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let end = s[start..]
        .chars()
        .next()
        .map(|c| start + c.len_utf8())
        .unwrap_or(start);
    (&s[..start], &s[start..end], &s[end..])
}
