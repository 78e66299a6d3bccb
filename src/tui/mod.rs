//! Terminal User Interface for sktop
//!
//! An interactive view of the user's own jobs with live refresh, multi-select,
//! kill, inspect and log viewing. All job state is owned by the engine; this
//! module wires it to the terminal and the gateway.

pub mod app;
pub mod event;
pub mod runtime;
pub mod theme;
pub mod ui;

use std::io::{self, IsTerminal, stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing::info;

use crate::gateway::SchedulerGateway;
use crate::models::AppConfig;
use crate::tui::app::{App, Viewport};
use crate::tui::runtime::{
    EffectExecutor, TuiRuntime, create_channels, run_event_loop, spawn_input_task,
    spawn_poll_ticker,
};

/// Terminal capability requirements for TUI mode
#[derive(Debug)]
pub struct TerminalCapabilities {
    pub is_tty: bool,
    pub term_type: String,
    pub supports_alternate_screen: bool,
}

impl TerminalCapabilities {
    pub fn detect() -> Self {
        let is_tty = stdout().is_terminal();
        let term_type = std::env::var("TERM").unwrap_or_default();
        Self::from_parts(is_tty, term_type)
    }

    fn from_parts(is_tty: bool, term_type: String) -> Self {
        // Known problematic terminals
        let supports_alternate_screen = !matches!(term_type.as_str(), "dumb" | "" | "unknown");
        Self {
            is_tty,
            term_type,
            supports_alternate_screen,
        }
    }

    #[must_use]
    pub fn is_suitable(&self) -> bool {
        self.is_tty && self.supports_alternate_screen
    }

    /// Error message for an unsuitable terminal
    #[must_use]
    pub fn error_message(&self) -> String {
        if !self.is_tty {
            "sktop requires an interactive terminal (stdout is not a TTY).".to_string()
        } else if !self.supports_alternate_screen {
            format!(
                "Terminal type '{}' may not support full-screen mode.\n\
                 Hint: Set TERM to a supported value (e.g., xterm-256color).",
                if self.term_type.is_empty() { "(unset)" } else { &self.term_type }
            )
        } else {
            "Unknown terminal capability issue.".to_string()
        }
    }
}

/// Everything the TUI needs from startup
pub struct Session {
    pub config: AppConfig,
    pub config_warnings: Vec<String>,
    pub username: String,
    pub gateway: Arc<dyn SchedulerGateway>,
}

/// Run the TUI application
pub async fn run_tui(session: Session) -> Result<()> {
    let capabilities = TerminalCapabilities::detect();
    if !capabilities.is_suitable() {
        bail!("{}", capabilities.error_message());
    }

    let mut terminal = setup_terminal()?;

    let Session {
        config,
        config_warnings,
        username,
        gateway,
    } = session;

    let mut app = App::new(config, config_warnings, username);
    if let Ok(size) = terminal.size() {
        app.viewport = Viewport {
            width: size.width,
            height: size.height,
        };
    }

    let (input_tx, input_rx, data_tx, data_rx) = create_channels();
    let mut runtime = TuiRuntime::new();

    runtime.track(spawn_input_task(input_tx, runtime.cancel_token()));
    runtime.track(spawn_poll_ticker(
        data_tx.clone(),
        runtime.cancel_token(),
        app.poll_interval(),
    ));

    let executor = EffectExecutor::new(gateway, &app.username, data_tx);
    info!(user = %app.username, interval = ?app.poll_interval(), "starting event loop");

    let result = run_event_loop(app, input_rx, data_rx, executor, |app| {
        terminal.draw(|frame| ui::render(app, frame))?;
        Ok(())
    })
    .await;

    runtime.shutdown().await;
    restore_terminal(&mut terminal)?;

    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the TUI on its own tokio runtime (entry point from main)
pub fn run(session: Session) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(run_tui(session));
    // A gateway call may still be running on the blocking pool; its own
    // command timeout bounds it, but don't hold the exit for it
    rt.shutdown_timeout(Duration::from_millis(500));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        assert!(TerminalCapabilities::from_parts(true, "xterm-256color".into()).is_suitable());
        assert!(!TerminalCapabilities::from_parts(false, "xterm".into()).is_suitable());

        let dumb = TerminalCapabilities::from_parts(true, "dumb".into());
        assert!(!dumb.is_suitable());
        assert!(dumb.error_message().contains("dumb"));

        let unset = TerminalCapabilities::from_parts(true, String::new());
        assert!(unset.error_message().contains("(unset)"));
    }
}
