//! UI rendering for the TUI
//!
//! Rendering is event-driven: a frame is drawn only after an event changed
//! something, never at a fixed frame rate. Every frame reads one engine
//! [`Snapshot`], so a single draw never mixes two generations.

mod jobs;
mod overlays;
mod widgets;

use chrono::Utc;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::engine::{ActionOutcome, PendingAction, Snapshot, ViewModel};
use crate::formatting::{format_age, format_elapsed, truncate_path};
use crate::models::JobId;
use crate::tui::app::{App, ModalState};
use crate::tui::theme::Theme;

use jobs::render_jobs_view;
use overlays::{
    render_confirm_dialog, render_error_toast, render_help_overlay, render_output_overlay,
};

/// Render the entire TUI
pub fn render(app: &App, frame: &mut Frame) {
    let snapshot = app.snapshot();
    let theme = &app.theme;
    let area = frame.area();

    let [info, content, status] = Layout::vertical([
        Constraint::Length(1), // Info bar
        Constraint::Min(0),    // Jobs table
        Constraint::Length(2), // Status bar
    ])
    .areas(area);

    render_info_bar(app, &snapshot, frame, info, theme);
    render_jobs_view(app, &snapshot, frame, content, theme);
    render_status_bar(app, &snapshot, frame, status, theme);

    // Overlays, lowest first
    if let Some(output) = &snapshot.output {
        render_output_overlay(app, output, frame, area, theme);
    }
    if let Some(targets) = &snapshot.confirming {
        render_confirm_dialog(targets, &snapshot.view, frame, area, theme);
    }
    if app.modal == ModalState::Help {
        render_help_overlay(frame, area, theme);
    }

    if let Some(error) = app.feedback.current_error() {
        render_error_toast(error, frame, area, theme);
    }
}

fn render_info_bar(app: &App, snapshot: &Snapshot, frame: &mut Frame, area: Rect, theme: &Theme) {
    let mut info = format!(
        " sktop | {} | every {:.1}s",
        app.username,
        app.poll_interval().as_secs_f64()
    );
    if let Some(summary) = snapshot
        .selection
        .cursor()
        .and_then(|id| cursor_summary(&snapshot.view, id))
    {
        info.push_str(" | ");
        info.push_str(&summary);
    }

    let style = if snapshot.view.stale.is_some() {
        Style::default().fg(theme.stale_indicator)
    } else {
        Style::default().fg(theme.border)
    };
    frame.render_widget(Paragraph::new(info).style(style), area);
}

/// One-line description of the job under the cursor
fn cursor_summary(view: &ViewModel, id: &JobId) -> Option<String> {
    let job = view.get(id)?;
    let mut parts = vec![format!("{} {}", job.id, job.state)];
    if job.elapsed_secs > 0 {
        parts.push(format_elapsed(job.elapsed_secs));
    }
    if let Some(path) = &job.stdout_path {
        parts.push(format!("out: {}", truncate_path(path, 40)));
    }
    Some(parts.join("  "))
}

fn render_status_bar(app: &App, snapshot: &Snapshot, frame: &mut Frame, area: Rect, theme: &Theme) {
    let [keys, line] = Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);

    let keybinds = if snapshot.confirming.is_some() {
        " y/Enter:confirm  n/Esc:cancel "
    } else if snapshot.output.is_some() {
        " j/k:scroll  g/G:top/bottom  Esc:close  q:quit "
    } else {
        " j/k:move  Space:select  x:kill  i:inspect  u/U:logs  r:refresh  ?:help  q:quit "
    };
    frame.render_widget(
        Paragraph::new(keybinds).style(Style::default().fg(theme.border)),
        keys,
    );

    let mut parts: Vec<Span> = Vec::new();

    // Freshness
    let view = &snapshot.view;
    match (&view.refreshed_at, &view.stale) {
        (_, Some(stale)) => {
            let failures = if stale.failures > 1 {
                format!(" x{}", stale.failures)
            } else {
                String::new()
            };
            parts.push(Span::styled(
                format!(" STALE ({}{})", stale.error, failures),
                Style::default().fg(theme.stale_indicator).bold(),
            ));
            if let Some(at) = view.refreshed_at {
                parts.push(Span::styled(
                    format!(" last good {} ago", age_since(at)),
                    Style::default().fg(theme.border),
                ));
            }
        }
        (Some(at), None) => parts.push(Span::styled(
            format!(" Updated {} ago", age_since(*at)),
            Style::default().fg(theme.border),
        )),
        (None, None) => parts.push(Span::styled(" Loading...", Style::default().fg(theme.pending))),
    }

    if snapshot.polling {
        parts.push(Span::styled(" [polling]", Style::default().fg(theme.border)));
    }

    if let Some(kind) = snapshot.submitting {
        parts.push(Span::raw(" | "));
        parts.push(Span::styled(
            format!("{} in progress...", kind),
            Style::default().fg(theme.warn),
        ));
    } else if let Some(latest) = &snapshot.latest
        && let Some(summary) = action_summary(latest)
    {
        let color = match latest.outcome {
            ActionOutcome::Failed(_) => theme.failed,
            _ => theme.running,
        };
        parts.push(Span::raw(" | "));
        parts.push(Span::styled(summary, Style::default().fg(color)));
    }

    // Config warnings stay until fixed
    if let Some(first) = app.feedback.config_warnings.first() {
        let more = app.feedback.config_warnings.len() - 1;
        let text = if more == 0 {
            format!(" | WARN: {}", first)
        } else {
            format!(" | WARN: {} (+{} more)", first, more)
        };
        parts.push(Span::styled(text, Style::default().fg(theme.warn)));
    }

    frame.render_widget(Paragraph::new(Line::from(parts)), line);
}

/// Job ids named in one status line before the rest are counted
const STATUS_ID_LIMIT: usize = 5;

/// Status text for a finished action. Kills name the jobs they touched.
fn action_summary(action: &PendingAction) -> Option<String> {
    let Some(report) = &action.report else {
        return action.summary.clone();
    };

    let mut text = String::new();
    if !report.succeeded.is_empty() {
        let ids: Vec<String> = report.succeeded.iter().map(ToString::to_string).collect();
        text = format!("Cancelled {}", join_limited(&ids));
    }
    if !report.failed.is_empty() {
        let failures: Vec<String> = report
            .failed
            .iter()
            .map(|(id, err)| format!("{} ({})", id, err))
            .collect();
        if !text.is_empty() {
            text.push_str("; ");
        }
        text.push_str("failed ");
        text.push_str(&join_limited(&failures));
    }
    Some(text)
}

fn join_limited(items: &[String]) -> String {
    if items.len() <= STATUS_ID_LIMIT {
        return items.join(", ");
    }
    format!(
        "{} +{} more",
        items[..STATUS_ID_LIMIT].join(", "),
        items.len() - STATUS_ID_LIMIT
    )
}

fn age_since(at: chrono::DateTime<Utc>) -> String {
    let secs = (Utc::now() - at).num_seconds().max(0) as u64;
    format_age(secs)
}
