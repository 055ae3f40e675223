use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use promptify_core::QuickAction;

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Apply a line-editing key to `buffer`. Returns false if the key is not an
/// editing key.
fn edit_line(buffer: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    let char_count = buffer.chars().count();
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(buffer, *cursor);
                buffer.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(buffer, *cursor);
                buffer.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(char_count),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = char_count,
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            buffer.clear();
            *cursor = 0;
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let byte_pos = char_to_byte_index(buffer, *cursor);
            buffer.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => return false,
    }
    true
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply(text) => app.receive_reply(text),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_attach_input {
        handle_attach_input(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn open_attach_input(app: &mut App) {
    app.show_attach_input = true;
    app.attach_input.clear();
    app.attach_input_cursor = 0;
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.focus = FocusPane::Chat;
        }

        KeyCode::Char('a') => open_attach_input(app),

        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Chat if !app.conversation.attachments().is_empty() => {
                    if app.attachment_state.selected().is_none() {
                        app.attachment_state.select(Some(0));
                    }
                    FocusPane::Attachments
                }
                _ => FocusPane::Chat,
            };
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Chat => app.scroll_chat_down(1),
            FocusPane::Attachments => app.attachments_nav_down(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Chat => app.scroll_chat_up(1),
            FocusPane::Attachments => app.attachments_nav_up(),
        },
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_up(app.chat_height / 2);
        }

        KeyCode::Char('d') | KeyCode::Delete if app.focus == FocusPane::Attachments => {
            app.remove_selected_attachment();
        }

        // Quick actions on the latest reply
        KeyCode::Char('1') => {
            app.quick_action(QuickAction::Summarize);
        }
        KeyCode::Char('2') => {
            app.quick_action(QuickAction::ExplainMore);
        }
        KeyCode::Char('3') => {
            app.quick_action(QuickAction::ExplainShorter);
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit(None);
        }
        KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            open_attach_input(app);
        }
        // Digits pick a quick action only while the input box is empty
        KeyCode::Char(c @ '1'..='3')
            if app.conversation.input.is_empty() && app.quick_actions_available() =>
        {
            let index = c as usize - '1' as usize;
            app.quick_action(QuickAction::all()[index]);
        }
        _ => {
            edit_line(&mut app.conversation.input, &mut app.input_cursor, key);
        }
    }
}

fn handle_attach_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_attach_input = false;
        }
        KeyCode::Enter => {
            let path = std::mem::take(&mut app.attach_input);
            app.attach_input_cursor = 0;
            app.show_attach_input = false;
            app.attach_path(&path);
        }
        _ => {
            edit_line(&mut app.attach_input, &mut app.attach_input_cursor, key);
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_chat_down(3),
        MouseEventKind::ScrollUp => app.scroll_chat_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use promptify_core::ai::DEFAULT_MODEL;
    use promptify_core::{ChatSession, Extractor, GeminiClient, PdfRuntime, Sender};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(buffer: &mut String, cursor: &mut usize, text: &str) {
        for c in text.chars() {
            edit_line(buffer, cursor, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("héllo", 10), 6);
    }

    #[test]
    fn test_edit_line_insert_and_delete() {
        let mut buffer = String::new();
        let mut cursor = 0;
        type_text(&mut buffer, &mut cursor, "héllo");
        assert_eq!(buffer, "héllo");
        assert_eq!(cursor, 5);

        edit_line(&mut buffer, &mut cursor, key(KeyCode::Home));
        edit_line(&mut buffer, &mut cursor, key(KeyCode::Right));
        edit_line(&mut buffer, &mut cursor, key(KeyCode::Delete));
        assert_eq!(buffer, "hllo");

        edit_line(&mut buffer, &mut cursor, key(KeyCode::End));
        edit_line(&mut buffer, &mut cursor, key(KeyCode::Backspace));
        assert_eq!(buffer, "hll");
        assert_eq!(cursor, 3);

        let ctrl_u = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert!(edit_line(&mut buffer, &mut cursor, ctrl_u));
        assert!(buffer.is_empty());
        assert_eq!(cursor, 0);
    }

    #[test]
    fn test_edit_line_ignores_other_keys() {
        let mut buffer = String::from("x");
        let mut cursor = 1;
        assert!(!edit_line(&mut buffer, &mut cursor, key(KeyCode::Tab)));
        let mut press = key(KeyCode::Char('s'));
        press.modifiers = KeyModifiers::CONTROL;
        press.kind = KeyEventKind::Press;
        assert!(!edit_line(&mut buffer, &mut cursor, press));
        assert_eq!(buffer, "x");
    }

    fn offline_app() -> App {
        let session = ChatSession::new(
            Extractor::new(Arc::new(PdfRuntime::default())),
            GeminiClient::new("http://127.0.0.1:9", DEFAULT_MODEL, None, None),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(session, tx)
    }

    #[tokio::test]
    async fn test_digits_type_until_a_reply_exists() {
        let mut app = offline_app();
        assert_eq!(app.input_mode, InputMode::Editing);

        handle_key(&mut app, key(KeyCode::Char('1')));
        assert_eq!(app.conversation.input, "1");
        assert!(!app.conversation.is_typing());
    }

    #[tokio::test]
    async fn test_digit_in_empty_input_runs_quick_action() {
        let mut app = offline_app();
        app.conversation.input = "Explain".to_string();
        app.conversation.begin_send(None).unwrap();
        app.conversation.resolve("Long answer".to_string());

        handle_key(&mut app, key(KeyCode::Char('2')));
        assert!(app.conversation.is_typing());
        assert!(app.conversation.input.is_empty());
        let user_texts: Vec<&str> = app
            .conversation
            .messages()
            .iter()
            .filter(|m| m.sender == Sender::User)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(user_texts, vec!["Explain", "Explain more this:\n\nLong answer"]);
    }

    #[tokio::test]
    async fn test_digit_after_text_is_typed() {
        let mut app = offline_app();
        app.conversation.input = "Explain".to_string();
        app.conversation.begin_send(None).unwrap();
        app.conversation.resolve("Long answer".to_string());

        app.conversation.input = "page ".to_string();
        app.input_cursor = 5;
        handle_key(&mut app, key(KeyCode::Char('3')));
        assert_eq!(app.conversation.input, "page 3");
        assert!(!app.conversation.is_typing());
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 3, 4, 5);
        assert!(point_in_rect(2, 3, rect));
        assert!(point_in_rect(5, 7, rect));
        assert!(!point_in_rect(6, 3, rect));
        assert!(!point_in_rect(1, 4, rect));
    }
}
