use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use promptify_core::format::{format_message, FormattedLine};
use promptify_core::{QuickAction, Sender};

use crate::app::{App, FocusPane, InputMode};

/// Most attachments listed before the panel scrolls.
const MAX_ATTACHMENT_ROWS: usize = 4;

fn styled_line(line: FormattedLine) -> Line<'static> {
    Line::from(
        line.into_iter()
            .map(|segment| {
                if segment.bold {
                    Span::styled(segment.text, Style::default().add_modifier(Modifier::BOLD))
                } else {
                    Span::raw(segment.text)
                }
            })
            .collect::<Vec<_>>(),
    )
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let attachment_count = app.conversation.attachments().len();
    let attachments_height = if attachment_count == 0 {
        0
    } else {
        (attachment_count.min(MAX_ATTACHMENT_ROWS) + 2) as u16 // +2 for borders
    };
    let actions_height = if app.quick_actions_available() { 1 } else { 0 };
    let status_height = if app.status.is_some() { 1 } else { 0 };

    let [header_area, chat_area, actions_area, attachments_area, input_area, status_area, footer_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(actions_height),
            Constraint::Length(attachments_height),
            Constraint::Length(3),
            Constraint::Length(status_height),
            Constraint::Length(1),
        ])
        .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    if actions_height > 0 {
        render_quick_actions(frame, actions_area);
    }
    if attachments_height > 0 {
        render_attachments(app, frame, attachments_area);
    }
    render_input(app, frame, input_area);
    if let Some(status) = &app.status {
        let line = Paragraph::new(Span::styled(
            format!(" {}", status),
            Style::default().fg(Color::Magenta),
        ));
        frame.render_widget(line, status_area);
    }
    render_footer(app, frame, footer_area);

    if app.show_attach_input {
        render_attach_input(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let pdf_state = if app.session.extractor().runtime().is_ready() {
        " [pdf ready]"
    } else {
        ""
    };

    let title = Line::from(vec![
        Span::styled(" Promptify ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.model_name().to_string(), Style::default().fg(Color::White)),
        Span::styled(pdf_state, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Chat && app.input_mode == InputMode::Normal;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Chat ");

    let text = if app.conversation.messages().is_empty() {
        Text::from(Span::styled(
            "Type a message, or press Ctrl+O to attach a PDF...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.conversation.messages() {
            match msg.sender {
                Sender::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(format_message(&msg.text).into_iter().map(styled_line));
                }
                Sender::Bot => {
                    lines.push(Line::from(Span::styled(
                        "Gemini:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(format_message(&msg.text).into_iter().map(styled_line));
                }
                Sender::Typing => {
                    lines.push(Line::from(Span::styled(
                        "Gemini:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    // Animated ellipsis: cycles through ".", "..", "..."
                    let label = msg.text.trim_end_matches('.');
                    let dots = ".".repeat((app.animation_frame as usize) + 1);
                    lines.push(Line::from(Span::styled(
                        format!("{}{}", label, dots),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                }
            }
            lines.push(Line::default());
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_quick_actions(frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(Color::White);

    let spans: Vec<Span> = QuickAction::all()
        .iter()
        .enumerate()
        .flat_map(|(i, action)| {
            [
                Span::styled(format!(" {} ", i + 1), key_style),
                Span::styled(format!(" {}  ", action.label()), label_style),
            ]
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_attachments(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Attachments;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::Magenta }))
        .title(format!(" Attachments ({}) ", app.conversation.attachments().len()));

    let items: Vec<ListItem> = app
        .conversation
        .attachments()
        .iter()
        .map(|attachment| ListItem::new(format!(" {} ", attachment.name)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    if focused {
        frame.render_stateful_widget(list, area, &mut app.attachment_state);
    } else {
        frame.render_widget(list, area);
    }
}

/// Visible slice of `text` and the cursor column within it.
fn scrolled_input(text: &str, cursor: usize, width: usize) -> (String, u16) {
    let offset = if width > 0 && cursor >= width {
        cursor - width + 1
    } else {
        0
    };
    let visible = text.chars().skip(offset).take(width).collect();
    (visible, (cursor - offset) as u16)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && !app.show_attach_input;
    let title = if app.conversation.is_typing() {
        " Waiting for reply... "
    } else {
        " Message "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible, cursor_x) = scrolled_input(&app.conversation.input, app.input_cursor, inner_width);

    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: Vec<(&str, &str)> = if app.show_attach_input {
        vec![(" Enter ", " attach "), (" Esc ", " cancel ")]
    } else {
        match (app.input_mode, app.focus) {
            (InputMode::Editing, _) => vec![
                (" Enter ", " send "),
                (" Ctrl+O ", " attach "),
                (" Esc ", " stop typing "),
            ],
            (InputMode::Normal, FocusPane::Attachments) => vec![
                (" j/k ", " select "),
                (" d ", " remove "),
                (" Tab ", " chat "),
                (" q ", " quit "),
            ],
            (InputMode::Normal, FocusPane::Chat) => vec![
                (" i ", " type "),
                (" a ", " attach "),
                (" j/k ", " scroll "),
                (" Tab ", " attachments "),
                (" q ", " quit "),
            ],
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(
            pairs
                .into_iter()
                .flat_map(|(key, label)| [Span::styled(key, key_style), Span::styled(label, label_style)]),
        )
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_attach_input(app: &App, frame: &mut Frame, area: Rect) {
    let [popup_row] = Layout::vertical([Constraint::Length(5)])
        .flex(Flex::Center)
        .areas(area);
    let [popup_area] = Layout::horizontal([Constraint::Percentage(60)])
        .flex(Flex::Center)
        .areas(popup_row);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Attach PDF ")
        .title_bottom(" path to a .pdf file ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [input_row] = Layout::vertical([Constraint::Length(1)])
        .flex(Flex::Center)
        .areas(inner);
    let (visible, cursor_x) =
        scrolled_input(&app.attach_input, app.attach_input_cursor, input_row.width as usize);
    frame.render_widget(Paragraph::new(visible), input_row);
    frame.set_cursor_position((input_row.x + cursor_x, input_row.y));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrolled_input_keeps_cursor_visible() {
        assert_eq!(scrolled_input("hello", 2, 10), ("hello".to_string(), 2));
        assert_eq!(scrolled_input("abcdefghij", 10, 4), ("hij".to_string(), 3));
        assert_eq!(scrolled_input("abc", 0, 0), (String::new(), 0));
    }

    #[test]
    fn test_styled_line_bold() {
        let lines = format_message("a **b**");
        let line = styled_line(lines.into_iter().next().unwrap());
        assert_eq!(line.spans.len(), 2);
        assert_eq!(line.spans[0].content, "a ");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }
}
