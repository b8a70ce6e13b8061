use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Conversation(event) => app.apply(event),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Back to typing
        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.conversation.draft().chars().count();
        }
        KeyCode::Esc => app.clear_selection(),

        // Half-page scroll (must be before plain 'd'/'u' style keys)
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_half_page_down(),
        KeyCode::PageUp => app.scroll_half_page_up(),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),

        // Code block selection and copy
        KeyCode::Tab | KeyCode::Char('n') => app.select_next_block(),
        KeyCode::BackTab | KeyCode::Char('N') => app.select_prev_block(),
        KeyCode::Char('c') | KeyCode::Char('y') => {
            app.copy_selected_block();
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.submit(),

        // Chat scrolling while typing
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_half_page_up(),
        KeyCode::PageDown => app.scroll_half_page_down(),

        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let draft = app.conversation.draft_mut();
                let byte_pos = char_to_byte_index(draft, app.input_cursor);
                draft.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let draft = app.conversation.draft_mut();
            if app.input_cursor < draft.chars().count() {
                let byte_pos = char_to_byte_index(draft, app.input_cursor);
                draft.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.conversation.draft().chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.conversation.draft().chars().count();
        }
        KeyCode::Char(c) => {
            let draft = app.conversation.draft_mut();
            let byte_pos = char_to_byte_index(draft, app.input_cursor);
            draft.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
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
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{app_with_greeting, RecordingClipboard};
    use crossterm::event::KeyEventState;
    use parley_core::ConversationEvent;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("héllo", 10), 6);
    }

    #[test]
    fn test_typing_edits_draft_at_cursor() {
        let (mut app, _rx) = app_with_greeting("hi", RecordingClipboard::default());
        type_text(&mut app, "helo");
        handle_event(&mut app, key(KeyCode::Left));
        type_text(&mut app, "l");
        assert_eq!(app.conversation.draft(), "hello");

        handle_event(&mut app, key(KeyCode::Home));
        handle_event(&mut app, key(KeyCode::Delete));
        handle_event(&mut app, key(KeyCode::End));
        handle_event(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.conversation.draft(), "ell");
        assert_eq!(app.input_cursor, 3);
    }

    #[test]
    fn test_enter_on_blank_draft_sends_nothing() {
        let (mut app, _rx) = app_with_greeting("hi", RecordingClipboard::default());
        type_text(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.conversation.messages().len(), 1);
        assert!(!app.conversation.is_pending());
        assert_eq!(app.conversation.draft(), "   ");
    }

    #[test]
    fn test_escape_and_insert_switch_modes() {
        let (mut app, _rx) = app_with_greeting("hi", RecordingClipboard::default());
        type_text(&mut app, "abc");
        handle_event(&mut app, key(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);

        // 'q' quits only in normal mode
        handle_event(&mut app, key(KeyCode::Char('i')));
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.input_cursor, 3);
        type_text(&mut app, "q");
        assert!(!app.should_quit);
        assert_eq!(app.conversation.draft(), "abcq");
    }

    #[test]
    fn test_ctrl_c_quits_from_any_mode() {
        let (mut app, _rx) = app_with_greeting("hi", RecordingClipboard::default());
        let ctrl_c = KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: crossterm::event::KeyEventKind::Press,
            state: KeyEventState::NONE,
        };
        handle_event(&mut app, AppEvent::Key(ctrl_c));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_copy_key_acknowledges_selected_block() {
        let clipboard = RecordingClipboard::default();
        let (mut app, _rx) =
            app_with_greeting("```a\none\n```\n```b\ntwo\n```", clipboard.clone());
        handle_event(&mut app, key(KeyCode::Esc));
        handle_event(&mut app, key(KeyCode::Tab));
        handle_event(&mut app, key(KeyCode::Char('c')));

        assert_eq!(app.conversation.copy_acknowledgment(), Some("one"));
        assert_eq!(*clipboard.writes.lock().unwrap(), vec!["one".to_string()]);
    }

    #[tokio::test]
    async fn test_expiry_event_clears_acknowledgment() {
        let (mut app, _rx) = app_with_greeting("```\nx\n```", RecordingClipboard::default());
        app.copy_selected_block();
        assert!(app.conversation.is_acknowledged("x"));

        handle_event(&mut app, AppEvent::Conversation(ConversationEvent::AcknowledgmentExpired(1)));
        assert_eq!(app.conversation.copy_acknowledgment(), None);
    }
}
