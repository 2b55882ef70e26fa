//! Input handling

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

/// Processed input action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Regular character input
    Char(char),
    /// Enter/submit
    Submit,
    Backspace,
    Delete,
    Left,
    Right,
    /// Previous query from history
    Up,
    /// Next query from history
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    /// Escape (cancels an in-flight query)
    Escape,
    /// Ctrl+C (cancel, or quit when idle)
    Interrupt,
    /// Ctrl+D (quit on empty input)
    Eof,
    /// Ctrl+U (clear line)
    ClearLine,
    /// Ctrl+W (delete word)
    DeleteWord,
    /// Bracketed paste
    Paste(String),
    /// Ctrl+Q
    Quit,
    /// Unknown/unhandled
    Unknown,
}

/// Convert a crossterm key event to an action
pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Interrupt,
            KeyCode::Char('d') => Action::Eof,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            KeyCode::Char('a') => Action::Home,
            KeyCode::Char('e') => Action::End,
            KeyCode::Char('q') => Action::Quit,
            _ => Action::Unknown,
        };
    }

    if modifiers.contains(KeyModifiers::ALT) {
        return Action::Unknown;
    }

    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Up => Action::Up,
        KeyCode::Down => Action::Down,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Esc => Action::Escape,
        _ => Action::Unknown,
    }
}

/// Convert a crossterm event to an action
pub fn event_to_action(event: Event) -> Option<Action> {
    match event {
        Event::Key(key_event) => Some(key_to_action(key_event)),
        Event::Paste(text) => Some(Action::Paste(text)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_ctrl_bindings() {
        assert_eq!(
            key_to_action(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Interrupt
        );
        assert_eq!(
            key_to_action(key(KeyCode::Char('q'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(
            key_to_action(key(KeyCode::Char('x'), KeyModifiers::CONTROL)),
            Action::Unknown
        );
    }

    #[test]
    fn test_plain_keys() {
        assert_eq!(
            key_to_action(key(KeyCode::Char('ñ'), KeyModifiers::NONE)),
            Action::Char('ñ')
        );
        assert_eq!(
            key_to_action(key(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            Action::Char('A')
        );
        assert_eq!(key_to_action(key(KeyCode::Esc, KeyModifiers::NONE)), Action::Escape);
        assert_eq!(key_to_action(key(KeyCode::Enter, KeyModifiers::NONE)), Action::Submit);
    }

    #[test]
    fn test_event_to_action() {
        assert_eq!(
            event_to_action(Event::Paste("hola".into())),
            Some(Action::Paste("hola".into()))
        );
        assert_eq!(event_to_action(Event::FocusGained), None);
    }
}
