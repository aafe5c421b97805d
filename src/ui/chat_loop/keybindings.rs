//! Key resolution for the chat loop.
//!
//! Keys resolve to a [`KeyBinding`] depending on whether a picker overlay
//! is open. Everything unbound while typing goes to the input box.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::app::AppAction;

/// Lines moved per arrow-key scroll.
const SCROLL_STEP: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyContext {
    Typing,
    Picker,
}

impl KeyContext {
    pub fn from_picker_open(picker_open: bool) -> Self {
        if picker_open {
            KeyContext::Picker
        } else {
            KeyContext::Typing
        }
    }
}

pub enum KeyBinding {
    Exit,
    /// Send the input box contents as a message or command.
    Submit,
    InsertNewline,
    Action(AppAction),
    /// Hand the key to the textarea.
    TextInput,
    Ignored,
}

pub fn resolve_key(key: &KeyEvent, context: KeyContext) -> KeyBinding {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d')) {
        return KeyBinding::Exit;
    }

    match context {
        KeyContext::Picker => match key.code {
            KeyCode::Esc => KeyBinding::Action(AppAction::PickerEscape),
            KeyCode::Up | KeyCode::Char('k') => KeyBinding::Action(AppAction::PickerMoveUp),
            KeyCode::Down | KeyCode::Char('j') => KeyBinding::Action(AppAction::PickerMoveDown),
            KeyCode::Enter => KeyBinding::Action(AppAction::PickerApplySelection),
            _ => KeyBinding::Ignored,
        },
        KeyContext::Typing => match key.code {
            KeyCode::Enter
                if key
                    .modifiers
                    .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
            {
                KeyBinding::InsertNewline
            }
            KeyCode::Enter => KeyBinding::Submit,
            KeyCode::Esc => KeyBinding::Action(AppAction::CancelStreaming),
            KeyCode::PageUp => KeyBinding::Action(AppAction::PageUp),
            KeyCode::PageDown => KeyBinding::Action(AppAction::PageDown),
            KeyCode::Up if ctrl => KeyBinding::Action(AppAction::ScrollUp { lines: SCROLL_STEP }),
            KeyCode::Down if ctrl => KeyBinding::Action(AppAction::ScrollDown {
                lines: SCROLL_STEP,
            }),
            KeyCode::End if ctrl => KeyBinding::Action(AppAction::ScrollToBottom),
            _ => KeyBinding::TextInput,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn ctrl_c_exits_in_every_context() {
        for context in [KeyContext::Typing, KeyContext::Picker] {
            assert!(matches!(
                resolve_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL), context),
                KeyBinding::Exit
            ));
        }
    }

    #[test]
    fn enter_submits_and_modified_enter_inserts_newline() {
        let typing = KeyContext::Typing;
        assert!(matches!(
            resolve_key(&key(KeyCode::Enter, KeyModifiers::NONE), typing),
            KeyBinding::Submit
        ));
        assert!(matches!(
            resolve_key(&key(KeyCode::Enter, KeyModifiers::ALT), typing),
            KeyBinding::InsertNewline
        ));
        assert!(matches!(
            resolve_key(&key(KeyCode::Enter, KeyModifiers::SHIFT), typing),
            KeyBinding::InsertNewline
        ));
    }

    #[test]
    fn escape_depends_on_context() {
        assert!(matches!(
            resolve_key(&key(KeyCode::Esc, KeyModifiers::NONE), KeyContext::Typing),
            KeyBinding::Action(AppAction::CancelStreaming)
        ));
        assert!(matches!(
            resolve_key(&key(KeyCode::Esc, KeyModifiers::NONE), KeyContext::Picker),
            KeyBinding::Action(AppAction::PickerEscape)
        ));
    }

    #[test]
    fn picker_navigation_keys() {
        let picker = KeyContext::Picker;
        assert!(matches!(
            resolve_key(&key(KeyCode::Up, KeyModifiers::NONE), picker),
            KeyBinding::Action(AppAction::PickerMoveUp)
        ));
        assert!(matches!(
            resolve_key(&key(KeyCode::Char('j'), KeyModifiers::NONE), picker),
            KeyBinding::Action(AppAction::PickerMoveDown)
        ));
        assert!(matches!(
            resolve_key(&key(KeyCode::Enter, KeyModifiers::NONE), picker),
            KeyBinding::Action(AppAction::PickerApplySelection)
        ));
        assert!(matches!(
            resolve_key(&key(KeyCode::Char('x'), KeyModifiers::NONE), picker),
            KeyBinding::Ignored
        ));
    }

    #[test]
    fn plain_characters_go_to_the_input_box() {
        assert!(matches!(
            resolve_key(&key(KeyCode::Char('j'), KeyModifiers::NONE), KeyContext::Typing),
            KeyBinding::TextInput
        ));
        assert!(matches!(
            resolve_key(&key(KeyCode::Up, KeyModifiers::NONE), KeyContext::Typing),
            KeyBinding::TextInput
        ));
    }

    #[test]
    fn paging_keys_scroll_the_transcript() {
        assert!(matches!(
            resolve_key(&key(KeyCode::PageUp, KeyModifiers::NONE), KeyContext::Typing),
            KeyBinding::Action(AppAction::PageUp)
        ));
        assert!(matches!(
            resolve_key(&key(KeyCode::Up, KeyModifiers::CONTROL), KeyContext::Typing),
            KeyBinding::Action(AppAction::ScrollUp { lines: 1 })
        ));
    }
}
