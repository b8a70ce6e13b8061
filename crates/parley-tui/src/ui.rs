use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use crate::app::{App, InputMode};
use parley_core::{parse, Accent, Language, Message, Role, Segment};

const CODE_BACKGROUND: Color = Color::Rgb(17, 24, 39);

/// Wrap text to fit within a given width, returning multiple lines.
/// Uses word boundaries for wrapping (doesn't break mid-word) and keeps the
/// line's leading indentation on every wrapped row.
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let indent: String = text.chars().take_while(|c| *c == ' ').collect();
    let indent_len = indent.chars().count();
    let width = width.saturating_sub(indent_len).max(1);

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len == 0 {
            // First word on line
            current_line = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            // Word fits on current line
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
        } else {
            // Word doesn't fit, start new line
            lines.push(format!("{}{}", indent, current_line));
            current_line = word.to_string();
            current_len = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(format!("{}{}", indent, current_line));
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Break a line of code into fixed-width rows, preserving whitespace
fn hard_wrap(text: &str, width: usize) -> Vec<String> {
    let text = text.replace('\t', "    ");
    if width == 0 || text.chars().count() <= width {
        return vec![text];
    }

    let chars: Vec<char> = text.chars().collect();
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}

fn accent_color(accent: Accent) -> Color {
    Color::Rgb(accent.r, accent.g, accent.b)
}

/// Rendered chat transcript plus where each code block starts
pub(crate) struct ChatView {
    pub lines: Vec<Line<'static>>,
    pub block_offsets: Vec<u16>,
}

fn line_index(lines: &[Line]) -> u16 {
    u16::try_from(lines.len()).unwrap_or(u16::MAX)
}

fn message_header(message: &Message) -> Line<'static> {
    let (label, color) = match message.role() {
        Role::User => ("You", Color::Cyan),
        Role::Assistant => ("AI", Color::Yellow),
    };
    Line::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  {}", message.timestamp().format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn push_prose(lines: &mut Vec<Line<'static>>, text: &str, width: usize, style: Style) {
    let text = text.trim_matches('\n');
    if text.trim().is_empty() {
        return;
    }

    for line in text.lines() {
        if line.trim().is_empty() {
            lines.push(Line::default());
            continue;
        }
        for row in wrap_text_to_width(line, width) {
            lines.push(Line::from(Span::styled(row, style)));
        }
    }
}

fn push_code_block(
    lines: &mut Vec<Line<'static>>,
    language: &Language,
    content: &str,
    width: usize,
    selected: bool,
    copied: bool,
) {
    let border_style = if selected {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let copy_label = match (copied, selected) {
        (true, _) => Span::styled(" ✓ Copied! ", Style::default().fg(Color::Green).bold()),
        (false, true) => Span::styled(" c Copy ", Style::default().fg(Color::White).bg(Color::DarkGray)),
        (false, false) => Span::styled(" Copy ", Style::default().fg(Color::Gray)),
    };

    let label = language.label().to_string();
    let used = 5 + label.chars().count() + copy_label.content.chars().count();
    let padding = width.saturating_sub(used);

    lines.push(Line::from(vec![
        Span::styled("┌ ", border_style),
        Span::styled("●", Style::default().fg(accent_color(language.accent()))),
        Span::raw(" "),
        Span::styled(label, Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
        Span::styled(format!(" {}", "─".repeat(padding)), border_style),
        copy_label,
    ]));

    let code_style = Style::default().fg(Color::White).bg(CODE_BACKGROUND);
    let code_width = width.saturating_sub(2);
    let source_lines: Vec<&str> = if content.is_empty() { vec![""] } else { content.lines().collect() };
    for source_line in source_lines {
        for row in hard_wrap(source_line, code_width) {
            let pad = code_width.saturating_sub(row.chars().count());
            lines.push(Line::from(vec![
                Span::styled("│ ", border_style),
                Span::styled(format!("{}{}", row, " ".repeat(pad)), code_style),
            ]));
        }
    }

    lines.push(Line::from(Span::styled(
        format!("└{}", "─".repeat(width.saturating_sub(1))),
        border_style,
    )));
}

/// Lay out the whole conversation at the given inner width
pub(crate) fn build_chat(app: &App, width: usize) -> ChatView {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut block_offsets = Vec::new();
    let mut block_index = 0;

    for message in app.conversation.messages() {
        lines.push(message_header(message));
        match message.role() {
            Role::User => push_prose(&mut lines, message.content(), width, Style::default().fg(Color::Cyan)),
            Role::Assistant => {
                for segment in parse(message.content()) {
                    match segment {
                        Segment::Prose(text) => push_prose(&mut lines, &text, width, Style::default()),
                        Segment::Code { language, content } => {
                            block_offsets.push(line_index(&lines));
                            push_code_block(
                                &mut lines,
                                &language,
                                &content,
                                width,
                                app.selected_block == Some(block_index),
                                app.conversation.is_acknowledged(&content),
                            );
                            block_index += 1;
                        }
                    }
                }
            }
        }
        lines.push(Line::default());
    }

    if app.conversation.is_pending() {
        lines.push(Line::from(Span::styled(
            "AI",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    ChatView { lines, block_offsets }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Parley ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("{} ", app.model), Style::default().fg(Color::White)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let view = build_chat(app, inner_width);

    // Store dimensions for scroll calculations and mouse hit-testing
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.total_chat_lines = line_index(&view.lines);
    app.block_offsets = view.block_offsets;

    let max_scroll = app.total_chat_lines.saturating_sub(app.chat_height);
    app.chat_scroll = if app.follow_tail {
        max_scroll
    } else {
        app.chat_scroll.min(max_scroll)
    };

    let border_color = if app.input_mode == InputMode::Normal { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Chat ({} messages) ", app.conversation.messages().len()));

    let chat = Paragraph::new(Text::from(view.lines))
        .block(block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.conversation.is_pending();
    let editing = app.input_mode == InputMode::Editing;

    let (title, border_color) = if pending {
        (" Waiting for reply... ", Color::DarkGray)
    } else if editing {
        (" Message (Enter to send) ", Color::Yellow)
    } else {
        (" Message (i to type) ", Color::DarkGray)
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible; inner width excludes borders
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .conversation
        .draft()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_color = if pending { Color::DarkGray } else { Color::Cyan };
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(input_block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let keys: &[(&str, &str)] = match app.input_mode {
        InputMode::Normal => &[
            (" i ", " type "),
            (" Tab ", " next code "),
            (" c ", " copy "),
            (" j/k ", " scroll "),
            (" q ", " quit "),
        ],
        InputMode::Editing => &[
            (" Enter ", " send "),
            (" ↑/↓ ", " scroll "),
            (" Esc ", " normal mode "),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style.add_modifier(Modifier::BOLD)), Span::raw(" ")];
    for (key, label) in keys {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
