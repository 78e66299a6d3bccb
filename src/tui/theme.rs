//! Theme definitions for the TUI
//!
//! Colorblind-safe palettes for dark and light terminals. The default is
//! "dark"; "light" is chosen via config file or `SKTOP_THEME`.

use ratatui::style::Color;

use crate::models::JobState;

/// Available theme names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

impl ThemeName {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "light" => ThemeName::Light,
            _ => ThemeName::Dark,
        }
    }
}

/// Color theme for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,

    pub fg: Color,
    pub border: Color,
    pub border_focused: Color,

    // Job state colors (colorblind-safe)
    pub running: Color,
    pub pending: Color,
    pub completed: Color,
    pub failed: Color,
    pub cancelling: Color,
    pub suspended: Color,

    // UI elements
    pub cursor_bg: Color,
    pub cursor_fg: Color,
    pub marked: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub stale_indicator: Color,
    pub warn: Color,
    pub highlight: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: ThemeName::Dark,

            fg: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,

            running: Color::Rgb(0, 200, 0),      // Bright green
            pending: Color::Rgb(255, 180, 0),    // Orange
            completed: Color::Rgb(80, 160, 255), // Light blue
            failed: Color::Rgb(255, 80, 80),     // Bright red
            cancelling: Color::DarkGray,
            suspended: Color::Magenta,

            cursor_bg: Color::Rgb(60, 60, 80),
            cursor_fg: Color::White,
            marked: Color::Rgb(255, 220, 120),
            header_bg: Color::Rgb(40, 80, 120),
            header_fg: Color::White,
            stale_indicator: Color::Rgb(255, 100, 100),
            warn: Color::Rgb(255, 180, 0),
            highlight: Color::Cyan,
        }
    }

    /// Darker, more saturated colors for light backgrounds
    pub fn light() -> Self {
        Self {
            name: ThemeName::Light,

            fg: Color::Black,
            border: Color::Rgb(120, 120, 120),
            border_focused: Color::Rgb(0, 100, 180),

            running: Color::Rgb(0, 140, 0),
            pending: Color::Rgb(200, 120, 0),
            completed: Color::Rgb(0, 80, 180),
            failed: Color::Rgb(200, 0, 0),
            cancelling: Color::Rgb(100, 100, 100),
            suspended: Color::Rgb(160, 0, 160),

            cursor_bg: Color::Rgb(200, 220, 255),
            cursor_fg: Color::Black,
            marked: Color::Rgb(150, 90, 0),
            header_bg: Color::Rgb(180, 200, 230),
            header_fg: Color::Black,
            stale_indicator: Color::Rgb(200, 0, 0),
            warn: Color::Rgb(200, 120, 0),
            highlight: Color::Rgb(0, 100, 180),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match ThemeName::parse(name) {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
        }
    }

    pub fn job_state_color(&self, state: JobState) -> Color {
        match state {
            JobState::Running | JobState::Completing => self.running,
            JobState::Pending => self.pending,
            JobState::Suspended => self.suspended,
            JobState::Completed => self.completed,
            JobState::Failed => self.failed,
            JobState::Cancelling => self.cancelling,
            JobState::Unknown => self.fg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_from_name() {
        assert_eq!(Theme::from_name("dark").name, ThemeName::Dark);
        assert_eq!(Theme::from_name("LIGHT").name, ThemeName::Light);
        // Unknown defaults to dark
        assert_eq!(Theme::from_name("solarized").name, ThemeName::Dark);
    }

    #[test]
    fn test_job_state_colors() {
        let theme = Theme::dark();
        assert_eq!(theme.job_state_color(JobState::Running), theme.running);
        assert_eq!(theme.job_state_color(JobState::Completing), theme.running);
        assert_eq!(theme.job_state_color(JobState::Pending), theme.pending);
        assert_eq!(theme.job_state_color(JobState::Failed), theme.failed);
        assert_eq!(theme.job_state_color(JobState::Cancelling), theme.cancelling);
    }
}
