//! Application state and key dispatch for the TUI
//!
//! `App` owns the [`Engine`] on the event loop task. Keys become engine entry
//! point calls; the effects the engine returns are queued here and drained by
//! the runtime, which runs them on gateway workers. Rendering reads the latest
//! published [`Snapshot`] and never touches engine state directly.

mod state;

pub use state::{FeedbackState, ModalState, OutputScroll, Viewport};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::debug;

use crate::engine::{ActionOutput, ActionRejected, Effect, Engine, EngineOptions, Snapshot};
use crate::gateway::LogStream;
use crate::models::AppConfig;
use crate::tui::event::{DataEvent, EventResult, InputEvent, KeyAction};
use crate::tui::theme::Theme;

/// Main application state
pub struct App {
    pub running: bool,

    engine: Engine,
    snapshot: watch::Receiver<Snapshot>,
    /// Effects returned by the engine, waiting for the runtime
    effects: Vec<Effect>,

    pub modal: ModalState,
    pub output_scroll: OutputScroll,
    /// Output the scroll position belongs to
    shown_output: Option<Arc<ActionOutput>>,
    pub viewport: Viewport,

    pub feedback: FeedbackState,
    pub config: AppConfig,
    pub theme: Theme,
    pub username: String,
}

impl App {
    pub fn new(config: AppConfig, config_warnings: Vec<String>, username: String) -> Self {
        let engine = Engine::new(EngineOptions::from_config(&config));
        let snapshot = engine.subscribe();
        let feedback = FeedbackState::new(
            config_warnings,
            Duration::from_secs(config.behavior.feedback_timeout_secs),
        );

        Self {
            running: true,
            engine,
            snapshot,
            effects: Vec::new(),
            modal: ModalState::None,
            output_scroll: OutputScroll::default(),
            shown_output: None,
            viewport: Viewport::default(),
            feedback,
            theme: Theme::from_name(&config.display.theme),
            config,
            username,
        }
    }

    /// Queue the first poll
    pub fn start(&mut self) {
        if let Some(effect) = self.engine.start() {
            self.effects.push(effect);
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.engine.poll_interval()
    }

    /// Latest published engine state
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Hand queued effects to the runtime
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Handle an input event
    pub fn handle_input(&mut self, event: InputEvent) -> EventResult {
        match event {
            InputEvent::Resize(width, height) => {
                self.viewport = Viewport { width, height };
                EventResult::Continue
            }
            InputEvent::Key(key_event) => {
                let snapshot = self.snapshot();
                let action = KeyAction::from_key_event(key_event, snapshot.confirming.is_some());
                self.handle_action(action, &snapshot)
            }
        }
    }

    fn handle_action(&mut self, action: KeyAction, snapshot: &Snapshot) -> EventResult {
        if action == KeyAction::Unknown {
            return EventResult::Unchanged;
        }
        if action == KeyAction::Quit {
            return self.quit();
        }

        // Help overlay takes priority
        if self.modal == ModalState::Help {
            return match action {
                KeyAction::Decline | KeyAction::ShowHelp => {
                    self.modal = ModalState::None;
                    EventResult::Continue
                }
                _ => EventResult::Unchanged,
            };
        }

        if snapshot.confirming.is_some() {
            return match action {
                KeyAction::Confirm => self.answer_confirmation(true),
                KeyAction::Decline => self.answer_confirmation(false),
                _ => EventResult::Unchanged,
            };
        }

        if let Some(output) = &snapshot.output {
            return self.handle_output_action(action, output);
        }

        match action {
            KeyAction::MoveUp => self.engine.on_move_cursor(-1),
            KeyAction::MoveDown => self.engine.on_move_cursor(1),
            KeyAction::PageUp => self.engine.on_move_cursor(-page_delta(self.viewport)),
            KeyAction::PageDown => self.engine.on_move_cursor(page_delta(self.viewport)),
            KeyAction::MoveToTop => self.engine.on_cursor_top(),
            KeyAction::MoveToBottom => self.engine.on_cursor_bottom(),

            KeyAction::ToggleSelect => {
                self.engine.on_toggle_cursor();
            }
            KeyAction::Kill => {
                let result = self.engine.on_kill();
                self.queue_or_report(result);
            }
            KeyAction::Inspect => {
                let result = self.engine.on_inspect().map(Some);
                self.queue_or_report(result);
            }
            KeyAction::ViewStdout => {
                let result = self.engine.on_view_log(LogStream::Stdout).map(Some);
                self.queue_or_report(result);
            }
            KeyAction::ViewStderr => {
                let result = self.engine.on_view_log(LogStream::Stderr).map(Some);
                self.queue_or_report(result);
            }
            KeyAction::Refresh => {
                if let Some(effect) = self.engine.on_refresh() {
                    self.effects.push(effect);
                }
            }

            // Outside a prompt, Esc dismisses action results first, then the selection
            KeyAction::Decline => {
                if snapshot.latest.is_some() || self.feedback.current_error().is_some() {
                    self.feedback.clear_error();
                    self.engine.on_acknowledge();
                } else {
                    self.engine.on_clear_selection();
                }
            }
            KeyAction::Confirm => return EventResult::Unchanged,

            KeyAction::ShowHelp => self.modal = ModalState::Help,

            KeyAction::Quit | KeyAction::Unknown => return EventResult::Unchanged,
        }
        EventResult::Continue
    }

    /// Keys while the inspect/log overlay is open scroll it
    fn handle_output_action(&mut self, action: KeyAction, output: &ActionOutput) -> EventResult {
        let total = output_line_count(output);
        let page = page_delta(self.viewport);
        match action {
            KeyAction::MoveUp => self.output_scroll.scroll_by(-1, total),
            KeyAction::MoveDown => self.output_scroll.scroll_by(1, total),
            KeyAction::PageUp => self.output_scroll.scroll_by(-page, total),
            KeyAction::PageDown => self.output_scroll.scroll_by(page, total),
            KeyAction::MoveToTop => self.output_scroll.to_top(),
            KeyAction::MoveToBottom => self
                .output_scroll
                .to_bottom(total, self.output_visible_rows()),
            KeyAction::Decline | KeyAction::Confirm | KeyAction::Inspect => {
                self.engine.on_acknowledge();
                self.shown_output = None;
            }
            KeyAction::Refresh => {
                if let Some(effect) = self.engine.on_refresh() {
                    self.effects.push(effect);
                }
            }
            _ => return EventResult::Unchanged,
        }
        EventResult::Continue
    }

    fn answer_confirmation(&mut self, accepted: bool) -> EventResult {
        if let Some(effect) = self.engine.on_confirm(accepted) {
            self.effects.push(effect);
        }
        EventResult::Continue
    }

    fn queue_or_report(&mut self, result: Result<Option<Effect>, ActionRejected>) {
        match result {
            Ok(Some(effect)) => self.effects.push(effect),
            Ok(None) => {}
            Err(rejected) => {
                debug!(%rejected, "action rejected");
                self.feedback.set_error(capitalize_first(&rejected.to_string()));
            }
        }
    }

    fn quit(&mut self) -> EventResult {
        if self.engine.on_quit() == Effect::Quit {
            self.running = false;
        }
        EventResult::Quit
    }

    /// Handle a timer tick or worker result
    pub fn handle_data(&mut self, event: DataEvent) -> EventResult {
        match event {
            DataEvent::Tick => {
                let effects = self.engine.on_tick(Instant::now());
                self.effects.extend(effects);
                self.feedback.expire();
                // Redraw anyway so the refresh age keeps counting
                EventResult::Continue
            }
            DataEvent::Worker(event) => {
                if let Some(effect) = self.engine.apply(event) {
                    self.effects.push(effect);
                }
                self.sync_output_scroll();
                EventResult::Continue
            }
        }
    }

    /// New output resets the scroll: details open at the top, logs at the tail.
    /// A re-read of the shown log keeps the position, following the tail only
    /// when the view was already there.
    fn sync_output_scroll(&mut self) {
        let output = self.snapshot.borrow().output.clone();
        let same = match (&output, &self.shown_output) {
            (Some(new), Some(old)) => Arc::ptr_eq(new, old),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }

        let visible = self.output_visible_rows();
        let reread = match (output.as_deref(), self.shown_output.as_deref()) {
            (Some(new), Some(old)) if is_same_log(new, old) => {
                Some((output_line_count(new), output_line_count(old)))
            }
            _ => None,
        };

        match reread {
            Some((total, old_total)) => {
                if self.output_scroll.offset >= old_total.saturating_sub(visible) {
                    self.output_scroll.to_bottom(total, visible);
                } else {
                    self.output_scroll.offset =
                        self.output_scroll.offset.min(total.saturating_sub(1));
                }
            }
            None => {
                self.output_scroll = OutputScroll::default();
                if let Some(output) = &output
                    && let ActionOutput::Log { .. } = output.as_ref()
                {
                    self.output_scroll.to_bottom(output_line_count(output), visible);
                }
            }
        }
        self.shown_output = output;
    }

    /// Text rows inside the output overlay
    #[must_use]
    pub fn output_visible_rows(&self) -> usize {
        let popup = usize::from(self.viewport.height) * OUTPUT_POPUP_PERCENT / 100;
        // Borders and the footer line
        popup.saturating_sub(3).max(1)
    }
}

/// Height of the output overlay as a share of the terminal
pub const OUTPUT_POPUP_PERCENT: usize = 80;

fn page_delta(viewport: Viewport) -> isize {
    isize::try_from(viewport.page_size()).unwrap_or(isize::MAX)
}

/// Lines the output overlay renders for this output
#[must_use]
pub fn output_line_count(output: &ActionOutput) -> usize {
    match output {
        ActionOutput::Details { details, .. } => details.fields.len(),
        ActionOutput::Log { text, .. } => text.lines().count(),
    }
}

/// Both outputs are the same job's log stream
fn is_same_log(a: &ActionOutput, b: &ActionOutput) -> bool {
    match (a, b) {
        (
            ActionOutput::Log { id, stream, .. },
            ActionOutput::Log {
                id: other_id,
                stream: other_stream,
                ..
            },
        ) => id == other_id && stream == other_stream,
        _ => false,
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
