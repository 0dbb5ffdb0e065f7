use std::ops::Range;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

use unicode_width::UnicodeWidthChar;

use booktype::drill::{Drill, Outcome};
use booktype::session::SessionSummary;

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
/// Lines of target text shown at once; the cursor sits on the second.
const TEXT_LINES: usize = 4;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Typing => render_typing(self, area, buf),
            AppState::Results => {
                if let Some(summary) = &self.summary {
                    render_summary(summary, area, buf);
                }
            }
        }
    }
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1) as usize;
    let text_height = TEXT_LINES as u16;
    let pad = area.height.saturating_sub(text_height + 4) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(pad),
            Constraint::Length(2),
            Constraint::Length(text_height),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(area);

    let drill = &app.drill;
    let now = app.now_ms();
    let mut status = vec![
        Span::styled(format!("{} wpm", drill.wpm().label()), bold_style),
        Span::raw("   "),
        Span::raw(format!("{}% acc", drill.stats.accuracy())),
        Span::raw("   "),
        Span::raw(format_duration(drill.stats.elapsed_ms(now))),
    ];
    if let Some(left) = drill.time_remaining_ms(now) {
        status.push(Span::raw("   "));
        status.push(Span::styled(
            format!("{} left", format_duration(left)),
            Style::default().fg(Color::Magenta),
        ));
    }
    Paragraph::new(Line::from(status))
        .alignment(Alignment::Left)
        .render(chunks[1], buf);

    Paragraph::new(text_window(drill, width)).render(chunks[2], buf);

    let source = match (drill.source().title(), &app.notice) {
        (Some(title), _) => title.to_string(),
        (None, Some(notice)) => format!("filler words ({notice})"),
        (None, None) => "filler words".to_string(),
    };
    Paragraph::new(vec![
        Line::from(Span::styled(source, italic_style)),
        Line::from(Span::styled("(esc) finish   (ctrl+c) quit", dim_style)),
    ])
    .wrap(Wrap { trim: true })
    .render(chunks[3], buf);
}

/// Splits `target` into lines of at most `width` columns, stopping once
/// `TEXT_LINES` lines past the one holding `cursor` are known.
fn wrap_lines(target: &[char], width: usize, cursor: usize) -> (Vec<Range<usize>>, usize) {
    let mut lines = Vec::new();
    let mut cursor_line = None;
    let mut line_start = 0;
    let mut cols = 0;

    for (idx, c) in target.iter().enumerate() {
        let w = c.width().unwrap_or(0);
        if cols + w > width && idx > line_start {
            lines.push(line_start..idx);
            if let Some(line) = cursor_line {
                if lines.len() >= line + TEXT_LINES {
                    return (lines, line);
                }
            }
            line_start = idx;
            cols = 0;
        }
        if idx == cursor {
            cursor_line = Some(lines.len());
        }
        cols += w;
    }
    if line_start < target.len() || lines.is_empty() {
        lines.push(line_start..target.len());
    }
    let cursor_line = cursor_line.unwrap_or(lines.len() - 1);
    (lines, cursor_line)
}

/// Up to `TEXT_LINES` lines of at most `width` columns around the cursor,
/// one line of history above it.
fn text_window(drill: &Drill, width: usize) -> Vec<Line<'static>> {
    let green_bold_style = Style::default().add_modifier(Modifier::BOLD).fg(Color::Green);
    let red_bold_style = Style::default().add_modifier(Modifier::BOLD).fg(Color::Red);
    let cursor_style = Style::default().add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
    let pending_style = Style::default().add_modifier(Modifier::DIM);

    let target = drill.target();
    let cursor = drill.cursor_pos();
    let (lines, cursor_line) = wrap_lines(target, width, cursor);
    let first = cursor_line.saturating_sub(1);

    lines
        .into_iter()
        .skip(first)
        .take(TEXT_LINES)
        .map(|range| {
            let spans: Vec<Span> = range
                .map(|idx| {
                    let expected = target[idx];
                    match drill.input.get(idx) {
                        Some(input) if input.outcome == Outcome::Correct => {
                            Span::styled(expected.to_string(), green_bold_style)
                        }
                        // a typo only replaces the glyph when it fits the same columns
                        Some(input) => Span::styled(
                            match input.char {
                                ' ' => "·".to_owned(),
                                c if c.width() == expected.width() => c.to_string(),
                                _ => expected.to_string(),
                            },
                            red_bold_style,
                        ),
                        None if idx == cursor => Span::styled(expected.to_string(), cursor_style),
                        None => Span::styled(expected.to_string(), pending_style),
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn render_summary(summary: &SessionSummary, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);

    let lines = vec![
        Line::from(Span::styled(
            format!("{} wpm   {}% acc", summary.average_wpm, summary.accuracy),
            bold_style.fg(Color::Magenta),
        )),
        Line::from(format!(
            "{} words   {} / {} chars correct   {}",
            summary.completed_words,
            summary.correct_chars,
            summary.typed_chars,
            format_duration(summary.duration_ms)
        )),
        Line::from(""),
        Line::from(Span::styled("(n)ew session   (esc) quit", dim_style)),
    ];

    let top = area.height.saturating_sub(lines.len() as u16) / 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(top), Constraint::Min(0)])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
}

fn format_duration(ms: u64) -> String {
    let secs = ms / 1_000;
    format!("{}:{:02}", secs / 60, secs % 60)
}
