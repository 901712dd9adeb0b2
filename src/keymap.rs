use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::controller::Panel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Mailbox,
    Detail,
    Compose,
}

impl From<Panel> for InputMode {
    fn from(panel: Panel) -> Self {
        match panel {
            Panel::Mailbox => InputMode::Mailbox,
            Panel::Detail => InputMode::Detail,
            Panel::Compose => InputMode::Compose,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Navigation
    MoveDown,
    MoveUp,
    JumpTop,
    JumpBottom,
    ScrollDown,
    ScrollUp,

    // Mailbox rows
    OpenEmail,
    ToggleArchive,

    // Mailbox switching (g-prefix sequences)
    GoInbox,
    GoSent,
    GoArchive,

    // Detail
    Reply,
    Back,

    // Compose
    Compose,
    NextField,
    PrevField,
    Submit,
    Cancel,
    Input(KeyEvent),

    // System
    Quit,
    Noop,
}

/// Tracks multi-key sequences (e.g., g then g for JumpTop, g then i for GoInbox).
pub struct KeyMapper {
    pending: Option<KeyCode>,
}

impl Default for KeyMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyMapper {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Process a key event and return an action, considering current input mode.
    pub fn handle(&mut self, key: KeyEvent, mode: InputMode) -> Action {
        match mode {
            InputMode::Mailbox => self.handle_mailbox(key),
            InputMode::Detail => self.handle_detail(key),
            InputMode::Compose => self.handle_compose(key),
        }
    }

    fn handle_mailbox(&mut self, key: KeyEvent) -> Action {
        if let Some(first) = self.pending.take() {
            return self.handle_sequence(first, key);
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => Action::MoveDown,
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => Action::MoveUp,
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => Action::JumpBottom,
            (KeyCode::Home, _) => Action::JumpTop,
            (KeyCode::Enter, _) => Action::OpenEmail,
            (KeyCode::Char('e'), KeyModifiers::NONE) => Action::ToggleArchive,
            _ => self.handle_global(key),
        }
    }

    fn handle_detail(&mut self, key: KeyEvent) -> Action {
        if let Some(first) = self.pending.take() {
            return self.handle_sequence(first, key);
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => Action::MoveDown,
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => Action::MoveUp,
            (KeyCode::Char(' '), KeyModifiers::NONE) | (KeyCode::PageDown, _) => {
                Action::ScrollDown
            }
            (KeyCode::Char(' '), KeyModifiers::SHIFT) | (KeyCode::PageUp, _) => Action::ScrollUp,
            (KeyCode::Char('r'), KeyModifiers::NONE) => Action::Reply,
            (KeyCode::Char('b'), KeyModifiers::NONE) | (KeyCode::Esc, _) => Action::Back,
            _ => self.handle_global(key),
        }
    }

    /// Keys shared by the mailbox and detail panels.
    fn handle_global(&mut self, key: KeyEvent) -> Action {
        match (key.code, key.modifiers) {
            (KeyCode::Char('g'), KeyModifiers::NONE) => {
                self.pending = Some(KeyCode::Char('g'));
                Action::Noop
            }
            (KeyCode::Char('c'), KeyModifiers::NONE) => Action::Compose,
            (KeyCode::Char('q'), KeyModifiers::NONE) => Action::Quit,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,
            _ => Action::Noop,
        }
    }

    fn handle_sequence(&mut self, first: KeyCode, key: KeyEvent) -> Action {
        match (first, key.code) {
            (KeyCode::Char('g'), KeyCode::Char('g')) => Action::JumpTop,
            (KeyCode::Char('g'), KeyCode::Char('i')) => Action::GoInbox,
            (KeyCode::Char('g'), KeyCode::Char('s')) => Action::GoSent,
            (KeyCode::Char('g'), KeyCode::Char('a')) => Action::GoArchive,
            _ => Action::Noop,
        }
    }

    /// Everything not bound here is text for the focused field.
    fn handle_compose(&mut self, key: KeyEvent) -> Action {
        self.pending = None;
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => Action::Cancel,
            (KeyCode::Tab, _) => Action::NextField,
            (KeyCode::BackTab, _) => Action::PrevField,
            (KeyCode::Char('s'), KeyModifiers::CONTROL) => Action::Submit,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,
            _ => Action::Input(key),
        }
    }

    /// Cancel any pending sequence (e.g., on timeout).
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_display(&self) -> Option<&str> {
        match self.pending {
            Some(KeyCode::Char('g')) => Some("g"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn g_sequences_switch_mailbox() {
        let mut km = KeyMapper::new();
        assert_eq!(km.handle(key(KeyCode::Char('g')), InputMode::Mailbox), Action::Noop);
        assert!(km.has_pending());
        assert_eq!(km.pending_display(), Some("g"));
        assert_eq!(km.handle(key(KeyCode::Char('s')), InputMode::Mailbox), Action::GoSent);
        assert!(!km.has_pending());

        km.handle(key(KeyCode::Char('g')), InputMode::Detail);
        assert_eq!(km.handle(key(KeyCode::Char('a')), InputMode::Detail), Action::GoArchive);

        km.handle(key(KeyCode::Char('g')), InputMode::Mailbox);
        assert_eq!(km.handle(key(KeyCode::Char('g')), InputMode::Mailbox), Action::JumpTop);
    }

    #[test]
    fn unknown_sequence_is_noop() {
        let mut km = KeyMapper::new();
        km.handle(key(KeyCode::Char('g')), InputMode::Mailbox);
        assert_eq!(km.handle(key(KeyCode::Char('z')), InputMode::Mailbox), Action::Noop);
        assert!(!km.has_pending());
    }

    #[test]
    fn mailbox_keys() {
        let mut km = KeyMapper::new();
        assert_eq!(km.handle(key(KeyCode::Enter), InputMode::Mailbox), Action::OpenEmail);
        assert_eq!(km.handle(key(KeyCode::Char('e')), InputMode::Mailbox), Action::ToggleArchive);
        assert_eq!(km.handle(key(KeyCode::Down), InputMode::Mailbox), Action::MoveDown);
        assert_eq!(km.handle(key(KeyCode::Char('c')), InputMode::Mailbox), Action::Compose);
        assert_eq!(km.handle(key(KeyCode::Char('q')), InputMode::Mailbox), Action::Quit);
    }

    #[test]
    fn detail_keys() {
        let mut km = KeyMapper::new();
        assert_eq!(km.handle(key(KeyCode::Char('r')), InputMode::Detail), Action::Reply);
        assert_eq!(km.handle(key(KeyCode::Char('b')), InputMode::Detail), Action::Back);
        assert_eq!(km.handle(key(KeyCode::Esc), InputMode::Detail), Action::Back);
        assert_eq!(km.handle(key(KeyCode::Char(' ')), InputMode::Detail), Action::ScrollDown);
    }

    #[test]
    fn compose_passes_text_through() {
        let mut km = KeyMapper::new();
        let q = key(KeyCode::Char('q'));
        assert_eq!(km.handle(q, InputMode::Compose), Action::Input(q));
        let g = key(KeyCode::Char('g'));
        assert_eq!(km.handle(g, InputMode::Compose), Action::Input(g));
        assert!(!km.has_pending());
    }

    #[test]
    fn compose_control_keys() {
        let mut km = KeyMapper::new();
        assert_eq!(km.handle(ctrl('s'), InputMode::Compose), Action::Submit);
        assert_eq!(km.handle(ctrl('c'), InputMode::Compose), Action::Quit);
        assert_eq!(km.handle(key(KeyCode::Tab), InputMode::Compose), Action::NextField);
        assert_eq!(km.handle(key(KeyCode::BackTab), InputMode::Compose), Action::PrevField);
        assert_eq!(km.handle(key(KeyCode::Esc), InputMode::Compose), Action::Cancel);
    }
}
