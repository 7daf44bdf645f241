use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, ChatRole};
use crate::input::wrap_line;
use crate::theme::Mode;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Composer height tracks the draft: 1..=8 content rows plus borders.
    let composer_width = area.width.saturating_sub(2);
    let composer_height = app.input.visible_rows(composer_width) + 2;

    let [header_area, chat_area, composer_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(composer_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_composer(app, frame, composer_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            " charla",
            Style::default()
                .fg(app.theme.text())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" · AI Assistant", Style::default().fg(app.theme.dim())),
    ]);
    frame.render_widget(Paragraph::new(title), area);

    let mode_label = match app.theme.mode() {
        Mode::Light => "light ",
        Mode::Dark => "dark ",
    };
    let mode = Paragraph::new(Span::styled(
        mode_label,
        Style::default().fg(app.theme.dim()),
    ))
    .alignment(Alignment::Right);
    frame.render_widget(mode, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Store chat area dimensions for scroll calculations
    app.chat_width = inner.width;
    app.chat_height = inner.height;

    if app.conversation.is_empty() {
        render_empty_state(app, frame, inner);
        return;
    }

    let lines = transcript_lines(app);

    let max_scroll = (lines.len() as u16).saturating_sub(inner.height);
    app.chat_scroll = app.chat_scroll.min(max_scroll);

    let chat = Paragraph::new(Text::from(lines)).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, inner);
}

/// The transcript, pre-wrapped to the chat width. `App::chat_line_count`
/// mirrors this layout for scroll arithmetic.
fn transcript_lines(app: &App) -> Vec<Line<'static>> {
    let wrap_width = app.chat_width.max(1) as usize;
    let mut lines: Vec<Line> = Vec::new();

    for message in [&app.conversation.user, &app.conversation.assistant]
        .into_iter()
        .flatten()
    {
        if message.content.is_empty() {
            continue;
        }

        let (label, accent) = match message.role {
            ChatRole::User => ("You:", app.theme.user_accent()),
            ChatRole::Assistant => ("AI:", app.theme.assistant_accent()),
        };
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        )));

        for content_line in message.content.lines() {
            for row in wrap_line(content_line, wrap_width) {
                lines.push(Line::styled(row, Style::default().fg(app.theme.text())));
            }
        }
        lines.push(Line::default());
    }

    if app.conversation.generating {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("AI is thinking{}", dots),
            Style::default()
                .fg(app.theme.dim())
                .add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::from(Span::styled(
            "press Esc to stop",
            Style::default().fg(app.theme.dim()),
        )));
    }

    lines
}

fn render_empty_state(app: &App, frame: &mut Frame, area: Rect) {
    let pad = area.height.saturating_sub(3) / 2;
    let mut lines: Vec<Line> = (0..pad).map(|_| Line::default()).collect();
    lines.push(Line::from(Span::styled(
        "How can I help you today?",
        Style::default()
            .fg(app.theme.text())
            .add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Send a message to get started.",
        Style::default().fg(app.theme.dim()),
    )));

    let empty = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
    frame.render_widget(empty, area);
}

fn render_composer(app: &mut App, frame: &mut Frame, area: Rect) {
    let generating = app.conversation.generating;

    // Three-state affordance: busy, disabled (blank draft), ready.
    let border_color = if generating {
        app.theme.dim()
    } else if app.input.is_blank() {
        app.theme.border()
    } else {
        app.theme.border_active()
    };

    let title = if generating {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        format!(" Generating{} ", dots)
    } else {
        " Message ".to_string()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width;
    let scroll_offset = app.input.scroll_offset(width);

    if app.input.text().is_empty() {
        let placeholder = Paragraph::new(Span::styled(
            "How can I help you today?",
            Style::default().fg(app.theme.dim()),
        ));
        frame.render_widget(placeholder, inner);
    } else {
        let rows: Vec<Line> = app
            .input
            .wrapped_rows(width)
            .into_iter()
            .skip(scroll_offset as usize)
            .take(inner.height as usize)
            .map(|row| Line::styled(row, Style::default().fg(app.theme.text())))
            .collect();
        frame.render_widget(Paragraph::new(Text::from(rows)), inner);
    }

    let (cursor_row, cursor_col) = app.input.cursor_row_col(width);
    frame.set_cursor_position((
        inner.x + cursor_col,
        inner.y + cursor_row.saturating_sub(scroll_offset),
    ));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints = if app.conversation.generating {
        " Esc stop · Ctrl+C quit"
    } else {
        " Enter send · Alt+Enter newline · Ctrl+T theme · PgUp/PgDn scroll · Ctrl+C quit"
    };
    frame.render_widget(
        Paragraph::new(Span::styled(hints, Style::default().fg(app.theme.dim()))),
        area,
    );

    let disclaimer = Paragraph::new(Span::styled(
        "AI can make mistakes. Check important info. ",
        Style::default().fg(app.theme.dim()),
    ))
    .alignment(Alignment::Right);
    frame.render_widget(disclaimer, area);
}
