// src/ui/keybindings.rs
//! Keyboard input handling and key mappings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Rows skipped by PageUp/PageDown.
pub const PAGE_STEP: usize = 10;

/// Map shifted digit keys to a section number (1..3).
fn section_for_key(key: &KeyEvent) -> Option<usize> {
    let KeyCode::Char(c) = key.code else {
        return None;
    };
    let shifted = key.modifiers.contains(KeyModifiers::SHIFT);
    match c {
        '!' => Some(1),
        '@' => Some(2),
        '#' => Some(3),
        '1' if shifted => Some(1),
        '2' if shifted => Some(2),
        '3' if shifted => Some(3),
        _ => None,
    }
}

/// Actions derived from key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Previous,
    Next,
    PageBack,
    PageForward,
    First,
    Last,
    Open,
    TogglePause,
    Stop,
    NextTrack,
    PreviousTrack,
    ToggleSection(usize),
    Quit,
    None,
}

/// Convert a key event to an action.
pub fn key_to_action(key: &KeyEvent) -> Action {
    if let Some(section) = section_for_key(key) {
        return Action::ToggleSection(section);
    }
    match key.code {
        KeyCode::Left => Action::Previous,
        KeyCode::Right => Action::Next,
        KeyCode::PageUp => Action::PageBack,
        KeyCode::PageDown => Action::PageForward,
        KeyCode::Home => Action::First,
        KeyCode::End => Action::Last,
        KeyCode::Enter => Action::Open,
        KeyCode::Char(' ') => Action::TogglePause,
        KeyCode::Char('s') => Action::Stop,
        KeyCode::Char('n') | KeyCode::Char('>') => Action::NextTrack,
        KeyCode::Char('p') | KeyCode::Char('<') => Action::PreviousTrack,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn arrows_step_the_carousel() {
        assert_eq!(key_to_action(&key(KeyCode::Left, KeyModifiers::NONE)), Action::Previous);
        assert_eq!(key_to_action(&key(KeyCode::Right, KeyModifiers::NONE)), Action::Next);
    }

    #[test]
    fn shifted_digits_toggle_sections() {
        assert_eq!(
            key_to_action(&key(KeyCode::Char('@'), KeyModifiers::SHIFT)),
            Action::ToggleSection(2)
        );
        assert_eq!(
            key_to_action(&key(KeyCode::Char('3'), KeyModifiers::SHIFT)),
            Action::ToggleSection(3)
        );
        assert_eq!(key_to_action(&key(KeyCode::Char('3'), KeyModifiers::NONE)), Action::None);
    }
}
