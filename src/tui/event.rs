//! Event types for the TUI
//!
//! Two channels feed the event loop:
//! - InputEvent: priority channel for terminal input (never dropped)
//! - DataEvent: timer ticks and gateway worker results

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::engine::WorkerEvent;

/// Input events from the terminal (priority channel - never dropped)
#[derive(Debug, Clone)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize(u16, u16),
}

/// Timer and worker events (data channel)
#[derive(Debug)]
pub enum DataEvent {
    /// Poll timer fired; may be dropped when the channel is full
    Tick,

    /// A gateway call finished; always delivered
    Worker(WorkerEvent),
}

/// Result of processing an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Continue running, UI needs redraw
    Continue,
    /// Continue running, no UI change needed
    Unchanged,
    /// Quit the application
    Quit,
}

/// Key action mappings for the TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    // Navigation
    MoveUp,
    MoveDown,
    MoveToTop,
    MoveToBottom,
    PageUp,
    PageDown,

    // Job actions
    ToggleSelect,
    Kill,
    Inspect,
    ViewStdout,
    ViewStderr,
    Refresh,

    // Prompt answers
    Confirm,
    Decline,

    // UI
    ShowHelp,
    Quit,

    Unknown,
}

impl KeyAction {
    /// Map a key event to an action. While the kill prompt is showing only
    /// the prompt answers and quit are recognized.
    pub fn from_key_event(event: KeyEvent, confirming: bool) -> Self {
        let KeyEvent {
            code,
            modifiers,
            kind,
            ..
        } = event;

        if kind == KeyEventKind::Release {
            return KeyAction::Unknown;
        }

        if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            return KeyAction::Quit;
        }

        if confirming {
            return match code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => KeyAction::Confirm,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => KeyAction::Decline,
                KeyCode::Char('q') => KeyAction::Quit,
                _ => KeyAction::Unknown,
            };
        }

        match code {
            KeyCode::Char('q') => KeyAction::Quit,

            // Ctrl+ combinations must come before bare character matches
            KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => KeyAction::PageDown,
            KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => KeyAction::PageUp,

            // Navigation
            KeyCode::Char('j') | KeyCode::Down => KeyAction::MoveDown,
            KeyCode::Char('k') | KeyCode::Up => KeyAction::MoveUp,
            KeyCode::Char('g') | KeyCode::Home => KeyAction::MoveToTop,
            KeyCode::Char('G') | KeyCode::End => KeyAction::MoveToBottom,
            KeyCode::PageDown => KeyAction::PageDown,
            KeyCode::PageUp => KeyAction::PageUp,

            // Actions
            KeyCode::Char(' ') => KeyAction::ToggleSelect,
            KeyCode::Char('x') => KeyAction::Kill,
            KeyCode::Char('i') | KeyCode::Enter => KeyAction::Inspect,
            KeyCode::Char('u') => KeyAction::ViewStdout,
            KeyCode::Char('U') => KeyAction::ViewStderr,
            KeyCode::Char('r') => KeyAction::Refresh,

            // Answers outside a prompt close overlays and clear the selection
            KeyCode::Char('y') => KeyAction::Confirm,
            KeyCode::Char('n') | KeyCode::Esc => KeyAction::Decline,

            KeyCode::Char('?') | KeyCode::F(1) => KeyAction::ShowHelp,

            _ => KeyAction::Unknown,
        }
    }
}
