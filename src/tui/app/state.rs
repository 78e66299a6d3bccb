//! UI-only state for the TUI
//!
//! Job state lives in the engine. What remains here is what the engine
//! has no business knowing: which overlay is open, output scroll position,
//! viewport size and transient feedback messages.

use std::time::{Duration, Instant};

// ============================================================================
// Modal State
// ============================================================================

/// Overlays owned by the UI. The kill prompt and the inspect/log output are
/// driven by the engine snapshot and are not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalState {
    #[default]
    None,
    Help,
}

impl ModalState {
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, ModalState::None)
    }
}

// ============================================================================
// Output Scrolling
// ============================================================================

/// Scroll position of the inspect/log overlay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputScroll {
    pub offset: usize,
}

impl OutputScroll {
    pub fn scroll_by(&mut self, delta: isize, total_lines: usize) {
        let max = total_lines.saturating_sub(1);
        self.offset = self.offset.saturating_add_signed(delta).min(max);
    }

    pub fn to_top(&mut self) {
        self.offset = 0;
    }

    /// Log tails open at the end, where the newest lines are
    pub fn to_bottom(&mut self, total_lines: usize, visible: usize) {
        self.offset = total_lines.saturating_sub(visible);
    }
}

// ============================================================================
// Viewport
// ============================================================================

/// Rows taken by the info bar, table border, table header and status bar
const CHROME_ROWS: u16 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
        }
    }
}

impl Viewport {
    /// Rows moved by PgUp/PgDn
    #[must_use]
    pub fn page_size(&self) -> usize {
        usize::from(self.height.saturating_sub(CHROME_ROWS)).max(1)
    }
}

// ============================================================================
// Feedback
// ============================================================================

/// Transient error line plus persistent config warnings
#[derive(Debug)]
pub struct FeedbackState {
    last_error: Option<(String, Instant)>,
    error_display_duration: Duration,
    pub config_warnings: Vec<String>,
}

impl FeedbackState {
    pub fn new(config_warnings: Vec<String>, error_display_duration: Duration) -> Self {
        Self {
            last_error: None,
            error_display_duration,
            config_warnings,
        }
    }

    pub fn set_error(&mut self, msg: String) {
        self.last_error = Some((msg, Instant::now()));
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    #[must_use]
    pub fn current_error(&self) -> Option<&str> {
        self.last_error
            .as_ref()
            .filter(|(_, at)| at.elapsed() < self.error_display_duration)
            .map(|(msg, _)| msg.as_str())
    }

    /// Forget an error whose display time ran out. Returns whether one did.
    pub fn expire(&mut self) -> bool {
        if self.last_error.is_some() && self.current_error().is_none() {
            self.last_error = None;
            true
        } else {
            false
        }
    }
}
