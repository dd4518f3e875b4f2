use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::App;

/// Route one key press. The auth prompt captures everything while it is
/// up; app chords come next; the suggestion overlay takes its few
/// navigation keys; whatever is left is encoded and sent to the shell.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if app.auth_prompt.is_some() {
        handle_auth_key(app, key);
        return;
    }
    if handle_chord(app, key) {
        return;
    }
    if handle_overlay_key(app, key) {
        return;
    }
    if handle_scroll_key(app, key) {
        return;
    }
    if key.code == KeyCode::Enter && app.retry_focused() {
        return;
    }
    if let Some(bytes) = encode_key(key) {
        app.send_keys(&bytes);
    }
}

/// Route one mouse event: wheel scrolls the focused pane, a left click
/// focuses the pane under the cursor.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_focused(3),
        MouseEventKind::ScrollDown => app.scroll_focused(-3),
        MouseEventKind::Down(MouseButton::Left) => app.focus_pane_at(mouse.column, mouse.row),
        _ => {}
    }
}

fn handle_auth_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_auth(),
        KeyCode::Esc => app.cancel_auth(),
        KeyCode::Backspace => {
            if let Some(prompt) = app.auth_prompt.as_mut() {
                prompt.input.pop();
            }
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(prompt) = app.auth_prompt.as_mut() {
                prompt.input.push(c);
            }
        }
        _ => {}
    }
}

/// App-level chords. Ctrl+T/W/S/Q never reach the remote shell; every
/// other control byte passes through.
fn handle_chord(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('t') => {
                app.new_tab();
                return true;
            }
            KeyCode::Char('w') => {
                app.close_pane();
                return true;
            }
            KeyCode::Char('s') => {
                app.split_pane();
                return true;
            }
            KeyCode::Char('q') => {
                app.quit();
                return true;
            }
            _ => return false,
        }
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        match key.code {
            KeyCode::Char(c @ '1'..='9') => {
                app.activate_tab(c as usize - '1' as usize);
                return true;
            }
            KeyCode::Char('o') => {
                app.focus_next_pane();
                return true;
            }
            KeyCode::Left => {
                app.prev_tab();
                return true;
            }
            KeyCode::Right => {
                app.next_tab();
                return true;
            }
            _ => return false,
        }
    }
    false
}

/// Up/Down/Tab/Esc belong to the overlay while it is visible; other
/// keys fall through so typing keeps refining the query.
fn handle_overlay_key(app: &mut App, key: KeyEvent) -> bool {
    let Some(id) = app.focused_session_id() else {
        return false;
    };
    let visible = app
        .sessions
        .get(&id)
        .map_or(false, |s| s.autocomplete.is_visible());
    if !visible {
        return false;
    }
    match key.code {
        KeyCode::Up => {
            if let Some(session) = app.sessions.get_mut(&id) {
                session.autocomplete.select_prev();
            }
            true
        }
        KeyCode::Down => {
            if let Some(session) = app.sessions.get_mut(&id) {
                session.autocomplete.select_next();
            }
            true
        }
        KeyCode::Tab => {
            app.apply_suggestion();
            true
        }
        KeyCode::Esc => {
            if let Some(session) = app.sessions.get_mut(&id) {
                session.autocomplete.dismiss();
                session.search_timer.cancel();
            }
            true
        }
        _ => false,
    }
}

fn handle_scroll_key(app: &mut App, key: KeyEvent) -> bool {
    if !key.modifiers.contains(KeyModifiers::SHIFT) {
        return false;
    }
    match key.code {
        KeyCode::PageUp => {
            app.scroll_page(1);
            true
        }
        KeyCode::PageDown => {
            app.scroll_page(-1);
            true
        }
        _ => false,
    }
}

/// Translate a key press into the bytes a terminal would emit.
fn encode_key(key: KeyEvent) -> Option<String> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char(c) = key.code {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() {
                return Some(((c as u8 - b'a' + 1) as char).to_string());
            }
        }
        return None;
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        if let KeyCode::Char(c) = key.code {
            return Some(format!("\x1b{c}"));
        }
        return None;
    }
    let encoded = match key.code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "\r".into(),
        KeyCode::Backspace => "\x7f".into(),
        KeyCode::Tab => "\t".into(),
        KeyCode::BackTab => "\x1b[Z".into(),
        KeyCode::Esc => "\x1b".into(),
        KeyCode::Up => "\x1b[A".into(),
        KeyCode::Down => "\x1b[B".into(),
        KeyCode::Right => "\x1b[C".into(),
        KeyCode::Left => "\x1b[D".into(),
        KeyCode::Home => "\x1b[H".into(),
        KeyCode::End => "\x1b[F".into(),
        KeyCode::PageUp => "\x1b[5~".into(),
        KeyCode::PageDown => "\x1b[6~".into(),
        KeyCode::Delete => "\x1b[3~".into(),
        KeyCode::Insert => "\x1b[2~".into(),
        _ => return None,
    };
    Some(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use crate::autocomplete::SuggestionItem;
    use crate::config::AppConfig;
    use crate::session::ServerRef;
    use crate::test_support::RecordingHost;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn test_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        // the receiver is dropped; these tests never pump async results
        App::new(
            AppConfig::default(),
            Arc::new(RecordingHost::new()),
            tx,
            ServerRef::local(),
        )
    }

    #[test]
    fn ctrl_chars_fold_to_control_bytes() {
        assert_eq!(
            encode_key(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some("\x03".to_string())
        );
        assert_eq!(
            encode_key(key(KeyCode::Char('d'), KeyModifiers::CONTROL)),
            Some("\x04".to_string())
        );
    }

    #[test]
    fn arrows_use_csi_sequences() {
        assert_eq!(
            encode_key(key(KeyCode::Up, KeyModifiers::NONE)),
            Some("\x1b[A".to_string())
        );
        assert_eq!(
            encode_key(key(KeyCode::Left, KeyModifiers::NONE)),
            Some("\x1b[D".to_string())
        );
    }

    #[test]
    fn alt_chars_get_an_escape_prefix() {
        assert_eq!(
            encode_key(key(KeyCode::Char('b'), KeyModifiers::ALT)),
            Some("\x1bb".to_string())
        );
    }

    #[test]
    fn plain_keys_pass_through() {
        assert_eq!(
            encode_key(key(KeyCode::Char('x'), KeyModifiers::NONE)),
            Some("x".to_string())
        );
        assert_eq!(
            encode_key(key(KeyCode::Enter, KeyModifiers::NONE)),
            Some("\r".to_string())
        );
        assert_eq!(
            encode_key(key(KeyCode::Backspace, KeyModifiers::NONE)),
            Some("\x7f".to_string())
        );
        assert_eq!(encode_key(key(KeyCode::F(1), KeyModifiers::NONE)), None);
    }

    #[tokio::test]
    async fn ctrl_t_opens_a_tab() {
        let mut app = test_app();
        handle_key_event(&mut app, key(KeyCode::Char('t'), KeyModifiers::CONTROL));
        assert_eq!(app.tabs.len(), 2);
        assert_eq!(app.active_tab, 1);
    }

    #[tokio::test]
    async fn ctrl_q_quits() {
        let mut app = test_app();
        handle_key_event(&mut app, key(KeyCode::Char('q'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn auth_prompt_captures_typed_characters() {
        let mut app = test_app();
        let id = app.focused_session_id().unwrap();
        app.auth_prompt = Some(crate::app::AuthPrompt {
            session: id,
            server: "local".into(),
            input: String::new(),
            expired: false,
        });
        handle_key_event(&mut app, key(KeyCode::Char('a'), KeyModifiers::NONE));
        handle_key_event(&mut app, key(KeyCode::Char('b'), KeyModifiers::NONE));
        handle_key_event(&mut app, key(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(app.auth_prompt.as_ref().unwrap().input, "a");
        handle_key_event(&mut app, key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(app.auth_prompt.is_none());
    }

    #[tokio::test]
    async fn escape_dismisses_the_overlay() {
        let mut app = test_app();
        let id = app.focused_session_id().unwrap();
        {
            let session = app.sessions.get_mut(&id).unwrap();
            session.autocomplete.feed("git");
            session
                .autocomplete
                .accept_results("git", vec![SuggestionItem::history("git status")]);
            assert!(session.autocomplete.is_visible());
        }
        handle_key_event(&mut app, key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!app.sessions[&id].autocomplete.is_visible());
    }

    #[tokio::test]
    async fn overlay_navigation_moves_the_selection() {
        let mut app = test_app();
        let id = app.focused_session_id().unwrap();
        {
            let session = app.sessions.get_mut(&id).unwrap();
            session.autocomplete.feed("g");
            session.autocomplete.accept_results(
                "g",
                vec![
                    SuggestionItem::history("git status"),
                    SuggestionItem::history("grep -r main"),
                ],
            );
        }
        handle_key_event(&mut app, key(KeyCode::Down, KeyModifiers::NONE));
        assert_eq!(app.sessions[&id].autocomplete.selected(), 1);
        handle_key_event(&mut app, key(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(app.sessions[&id].autocomplete.selected(), 0);
    }
}
