use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

use crate::{
    app::{App, Screen},
    highlight::TokenKind,
    session::{Clock, TypingSession},
    settings::{Mode, Settings},
    stats::Stats,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl<C: Clock> Widget for &App<C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match (self.screen(), self.last_stats()) {
            (Screen::Results, Some(stats)) => render_results(stats, area, buf),
            _ => render_typing(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn kind_color(kind: TokenKind) -> Color {
    match kind {
        TokenKind::Keyword => Color::Magenta,
        TokenKind::Function => Color::Blue,
        TokenKind::String => Color::Yellow,
        TokenKind::Number => Color::Cyan,
        TokenKind::Comment => Color::DarkGray,
        TokenKind::Punctuation => Color::Gray,
        TokenKind::Text => Color::White,
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Line and column (in terminal cells) of the char at `index` in `target`.
///
/// Lines are split on `\n` only; code is never soft-wrapped.
pub fn caret_position(target: &str, index: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;
    for c in target.chars().take(index) {
        if c == '\n' {
            line += 1;
            col = 0;
        } else {
            col += c.width().unwrap_or(0);
        }
    }
    (line, col)
}

/// First visible line so that `caret_line` stays inside `height` rows
pub fn scroll_offset(caret_line: usize, height: usize) -> usize {
    caret_line.saturating_sub(height.saturating_sub(1))
}

/// Styled lines of the typing area, one per target line
pub fn typing_lines<C: Clock>(session: &TypingSession<C>) -> Vec<Line<'static>> {
    let correct = bold().fg(Color::Green);
    let wrong = bold().fg(Color::Red);
    let caret = bold().add_modifier(Modifier::UNDERLINED);
    let caret_idx = session.typed_len();

    let mut lines = Vec::new();
    let mut spans = Vec::new();

    for (idx, cell) in session.cells().into_iter().enumerate() {
        let marker = match (cell.is_correct(), cell.expected) {
            (Some(false), ' ') => Some(Span::styled("·", wrong)),
            (Some(false), '\n') => Some(Span::styled("↵", wrong)),
            (Some(false), c) => Some(Span::styled(c.to_string(), wrong)),
            (Some(true), '\n') => None,
            (Some(true), c) => Some(Span::styled(c.to_string(), correct)),
            (None, '\n') if idx == caret_idx => Some(Span::styled(" ", caret)),
            (None, '\n') => None,
            (None, c) if idx == caret_idx => Some(Span::styled(c.to_string(), caret)),
            (None, c) => Some(Span::styled(
                c.to_string(),
                dim().fg(kind_color(cell.kind)),
            )),
        };

        if let Some(span) = marker {
            spans.push(span);
        }
        if cell.expected == '\n' {
            lines.push(Line::from(std::mem::take(&mut spans)));
        }
    }
    lines.push(Line::from(spans));
    lines
}

fn snippet_header<C: Clock>(app: &App<C>) -> Line<'static> {
    let snippet = app.snippet();
    let mut spans = vec![
        Span::styled(snippet.language.clone(), bold().fg(Color::Cyan)),
        Span::styled(format!("  {}", snippet.difficulty), dim()),
    ];
    if let Some(description) = &snippet.description {
        spans.push(Span::styled(format!("  {description}"), italic()));
    }
    Line::from(spans)
}

fn progress_label<C: Clock>(session: &TypingSession<C>) -> String {
    let config = session.config();
    match config.mode {
        Mode::Time => format!(
            "{}s",
            session
                .time_remaining()
                .unwrap_or(config.time_duration.secs())
        ),
        Mode::Count => format!("{}/{}", session.typed_len(), session.target_len()),
        Mode::Zen => "zen".to_string(),
    }
}

fn live_header<C: Clock>(session: &TypingSession<C>) -> Line<'static> {
    let mut spans = vec![Span::styled(progress_label(session), bold().fg(Color::Yellow))];
    if session.has_started() {
        spans.push(Span::styled(
            format!(
                "   {} wpm   {}% acc",
                session.current_wpm(),
                session.current_accuracy()
            ),
            bold(),
        ));
    }
    Line::from(spans)
}

fn settings_line(settings: &Settings, category: impl std::fmt::Display) -> String {
    let length = match settings.mode {
        Mode::Time => settings.time_duration.to_string(),
        Mode::Count => format!("{} words", settings.count_amount),
        Mode::Zen => "-".to_string(),
    };
    format!(
        "(F1) {}  (F2) {}  (F3) punctuation {}  (F4) numbers {}  (F5) {}  (F6) {}",
        settings.mode,
        length,
        on_off(settings.allow_punctuation),
        on_off(settings.allow_numbers),
        settings.difficulty,
        category
    )
}

fn render_typing<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let session = app.session();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // snippet
            Constraint::Length(1), // timer / progress and live metrics
            Constraint::Length(1),
            Constraint::Min(1), // code
            Constraint::Length(1),
            Constraint::Length(1), // status or legend
            Constraint::Length(1), // settings
        ])
        .split(area);

    Paragraph::new(snippet_header(app)).render(chunks[0], buf);
    Paragraph::new(live_header(session)).render(chunks[1], buf);

    let (caret_line, _) = caret_position(session.target(), session.typed_len());
    let offset = scroll_offset(caret_line, chunks[3].height as usize);
    Paragraph::new(typing_lines(session))
        .scroll((u16::try_from(offset).unwrap_or(u16::MAX), 0))
        .render(chunks[3], buf);

    let footer = match app.status() {
        Some(status) => Span::styled(status.to_string(), bold().fg(Color::Red)),
        None => Span::styled("(tab) restart / (ctrl+f) finish / (esc) quit", italic()),
    };
    Paragraph::new(footer).render(chunks[5], buf);

    Paragraph::new(Span::styled(
        settings_line(app.settings(), app.category()),
        italic().fg(Color::Gray),
    ))
    .render(chunks[6], buf);
}

fn missed_line(top_missed: Vec<(String, usize)>) -> Line<'static> {
    let mut spans = vec![Span::styled("most missed  ", dim())];
    if top_missed.is_empty() {
        spans.push(Span::styled("none", bold().fg(Color::Green)));
    }
    for (c, count) in top_missed {
        spans.push(Span::styled(c, bold().fg(Color::Red)));
        spans.push(Span::styled(format!(" ×{count}   "), dim()));
    }
    Line::from(spans)
}

fn render_results(stats: &Stats, area: Rect, buf: &mut Buffer) {
    let summary = stats.summary();

    let block = Block::default().borders(Borders::ALL).title(" results ");
    let inner = block.inner(area);
    block.render(area, buf);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // wpm
            Constraint::Length(1), // accuracy
            Constraint::Length(1), // time
            Constraint::Length(1), // errors
            Constraint::Length(1),
            Constraint::Length(1), // most missed
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(inner);

    let rows = [
        Line::from(vec![
            Span::styled(format!("{} wpm", summary.wpm), bold().fg(Color::Yellow)),
            Span::styled(format!("   {}", summary.raw_wpm), dim()),
        ]),
        Line::from(Span::styled(format!("{} acc", summary.accuracy), bold())),
        Line::from(Span::styled(format!("{} time", summary.time), bold())),
        Line::from(Span::styled(format!("{} errors", summary.errors), bold())),
    ];
    for (row, chunk) in rows.into_iter().zip(chunks.iter()) {
        Paragraph::new(row)
            .alignment(Alignment::Center)
            .render(*chunk, buf);
    }

    Paragraph::new(missed_line(summary.top_missed))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);

    Paragraph::new(Span::styled("(n)ext / (r)estart / (q)uit", italic()))
        .alignment(Alignment::Center)
        .render(chunks[7], buf);
}
