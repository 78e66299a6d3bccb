//! Action coordination.
//!
//! Serializes kill, inspect and view-log against the background poll. Only
//! one of these may be confirming or submitting at a time; a second trigger
//! is rejected, not queued. Manual refreshes are tracked here too, but they
//! never block the other kinds.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::gateway::{GatewayError, LogStream};
use crate::models::JobId;

pub type ActionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Kill,
    Inspect,
    ViewLog(LogStream),
    Refresh,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Kill => f.write_str("kill"),
            ActionKind::Inspect => f.write_str("inspect"),
            ActionKind::ViewLog(stream) => write!(f, "{} log", stream),
            ActionKind::Refresh => f.write_str("refresh"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Pending,
    Succeeded,
    Failed(String),
}

/// A user action from trigger until it is acknowledged or times out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub id: ActionId,
    pub kind: ActionKind,
    pub targets: Vec<JobId>,
    pub submitted_at: Instant,
    pub outcome: ActionOutcome,
    pub finished_at: Option<Instant>,
    /// One-line result for the status bar
    pub summary: Option<String>,
    /// Per-target results, kills only
    pub report: Option<KillReport>,
}

impl PendingAction {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.outcome != ActionOutcome::Pending
    }
}

/// Per-target results of one kill
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillReport {
    pub succeeded: Vec<JobId>,
    pub failed: Vec<(JobId, GatewayError)>,
}

impl KillReport {
    #[must_use]
    pub fn summary(&self) -> String {
        let mut text = match self.succeeded.len() {
            0 => String::new(),
            1 => format!("Cancelled job {}", self.succeeded[0]),
            n => format!("Cancelled {} jobs", n),
        };
        if !self.failed.is_empty() {
            let failures: Vec<String> = self
                .failed
                .iter()
                .map(|(id, err)| format!("{} ({})", id, err.kind_label()))
                .collect();
            if !text.is_empty() {
                text.push_str("; ");
            }
            text.push_str(&format!("failed: {}", failures.join(", ")));
        }
        text
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRejected {
    #[error("another action is still in progress")]
    Busy,

    #[error("no job under the cursor")]
    NoTarget,
}

/// Where the coordinator is in the kill/inspect/view-log state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Confirming { targets: Vec<JobId> },
    Submitting { action: ActionId },
}

/// Result of asking for a kill
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillStep {
    /// A confirmation prompt is now showing
    NeedsConfirmation,
    /// Cancel these targets now
    Submit { action: ActionId, targets: Vec<JobId> },
}

#[derive(Debug)]
pub struct ActionCoordinator {
    phase: Phase,
    actions: Vec<PendingAction>,
    next_id: ActionId,
    confirm_kill: bool,
    display_timeout: Duration,
}

impl ActionCoordinator {
    pub fn new(confirm_kill: bool, display_timeout: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            actions: Vec::new(),
            next_id: 1,
            confirm_kill,
            display_timeout,
        }
    }

    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Actions not yet retired, oldest first
    #[must_use]
    pub fn actions(&self) -> &[PendingAction] {
        &self.actions
    }

    /// Targets awaiting confirmation, if a prompt is showing
    #[must_use]
    pub fn confirming(&self) -> Option<&[JobId]> {
        match &self.phase {
            Phase::Confirming { targets } => Some(targets),
            _ => None,
        }
    }

    /// Kind of the action currently submitting
    #[must_use]
    pub fn submitting(&self) -> Option<ActionKind> {
        match self.phase {
            Phase::Submitting { action } => self.find(action).map(|a| a.kind),
            _ => None,
        }
    }

    pub fn request_kill(
        &mut self,
        targets: Vec<JobId>,
        now: Instant,
    ) -> Result<KillStep, ActionRejected> {
        if self.is_busy() {
            return Err(ActionRejected::Busy);
        }
        if targets.is_empty() {
            return Err(ActionRejected::NoTarget);
        }

        if self.confirm_kill {
            debug!(targets = targets.len(), "kill awaiting confirmation");
            self.phase = Phase::Confirming { targets };
            Ok(KillStep::NeedsConfirmation)
        } else {
            let action = self.submit(ActionKind::Kill, targets.clone(), now);
            Ok(KillStep::Submit { action, targets })
        }
    }

    /// Answer the confirmation prompt. Returns the kill to submit if accepted.
    pub fn confirm(&mut self, accepted: bool, now: Instant) -> Option<(ActionId, Vec<JobId>)> {
        if !matches!(self.phase, Phase::Confirming { .. }) {
            return None;
        }
        let Phase::Confirming { targets } = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return None;
        };

        if !accepted {
            debug!("kill declined");
            return None;
        }
        let action = self.submit(ActionKind::Kill, targets.clone(), now);
        Some((action, targets))
    }

    /// Start an inspect or view-log fetch for the cursor row
    pub fn request_fetch(
        &mut self,
        kind: ActionKind,
        target: Option<JobId>,
        now: Instant,
    ) -> Result<(ActionId, JobId), ActionRejected> {
        if self.is_busy() {
            return Err(ActionRejected::Busy);
        }
        let target = target.ok_or(ActionRejected::NoTarget)?;
        let action = self.submit(kind, vec![target.clone()], now);
        Ok((action, target))
    }

    /// Reserve an id for background work that has no status-bar record
    pub fn allocate_id(&mut self) -> ActionId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn submit(&mut self, kind: ActionKind, targets: Vec<JobId>, now: Instant) -> ActionId {
        let id = self.allocate_id();
        info!(action = id, %kind, targets = targets.len(), "submitting action");

        self.actions.push(PendingAction {
            id,
            kind,
            targets,
            submitted_at: now,
            outcome: ActionOutcome::Pending,
            finished_at: None,
            summary: None,
            report: None,
        });
        if kind != ActionKind::Refresh {
            self.phase = Phase::Submitting { action: id };
        }
        id
    }

    /// Record a manual refresh; overlapping requests share one record
    pub fn track_refresh(&mut self, now: Instant) -> ActionId {
        match self
            .actions
            .iter()
            .find(|a| a.kind == ActionKind::Refresh && !a.is_finished())
        {
            Some(existing) => existing.id,
            None => self.submit(ActionKind::Refresh, Vec::new(), now),
        }
    }

    /// Resolve every outstanding refresh record with one poll result
    pub fn finish_refresh(&mut self, error: Option<&GatewayError>, now: Instant) {
        let outstanding: Vec<ActionId> = self
            .actions
            .iter()
            .filter(|a| a.kind == ActionKind::Refresh && !a.is_finished())
            .map(|a| a.id)
            .collect();
        for id in outstanding {
            let (outcome, summary) = match error {
                None => (ActionOutcome::Succeeded, "Refreshed".to_string()),
                Some(err) => (
                    ActionOutcome::Failed(err.to_string()),
                    format!("Refresh failed: {}", err),
                ),
            };
            self.finish(id, outcome, summary, now);
        }
    }

    /// Resolve a kill. Returns false for an unknown or already finished id.
    pub fn complete_kill(&mut self, action: ActionId, report: &KillReport, now: Instant) -> bool {
        let outcome = match report.failed.as_slice() {
            [] => ActionOutcome::Succeeded,
            failed => ActionOutcome::Failed(
                failed
                    .iter()
                    .map(|(id, err)| format!("{}: {}", id, err))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        };
        if !report.failed.is_empty() {
            warn!(
                action,
                failed = report.failed.len(),
                succeeded = report.succeeded.len(),
                "kill partially failed"
            );
        }
        if !self.finish(action, outcome, report.summary(), now) {
            return false;
        }
        if let Some(entry) = self.actions.iter_mut().find(|a| a.id == action) {
            entry.report = Some(report.clone());
        }
        true
    }

    /// Resolve an inspect or view-log fetch
    pub fn complete_fetch(
        &mut self,
        action: ActionId,
        error: Option<&GatewayError>,
        now: Instant,
    ) -> bool {
        let Some(kind) = self.find(action).map(|a| a.kind) else {
            return false;
        };
        let (outcome, summary) = match error {
            None => (ActionOutcome::Succeeded, format!("Loaded {}", kind)),
            Some(err) => {
                warn!(action, %kind, error = %err, "fetch failed");
                (
                    ActionOutcome::Failed(err.to_string()),
                    format!("{} failed: {}", capitalize(&kind.to_string()), err),
                )
            }
        };
        self.finish(action, outcome, summary, now)
    }

    fn finish(
        &mut self,
        action: ActionId,
        outcome: ActionOutcome,
        summary: String,
        now: Instant,
    ) -> bool {
        if self.phase == (Phase::Submitting { action }) {
            self.phase = Phase::Idle;
        }
        let Some(entry) = self.actions.iter_mut().find(|a| a.id == action) else {
            return false;
        };
        if entry.is_finished() {
            return false;
        }
        debug!(action, outcome = ?outcome, "action finished");
        entry.outcome = outcome;
        entry.finished_at = Some(now);
        entry.summary = Some(summary);
        true
    }

    fn find(&self, action: ActionId) -> Option<&PendingAction> {
        self.actions.iter().find(|a| a.id == action)
    }

    /// Retire every finished action. Returns whether anything was retired.
    pub fn acknowledge(&mut self) -> bool {
        let before = self.actions.len();
        self.actions.retain(|a| !a.is_finished());
        self.actions.len() != before
    }

    /// Retire finished actions older than the display timeout
    pub fn expire(&mut self, now: Instant) -> bool {
        let timeout = self.display_timeout;
        let before = self.actions.len();
        self.actions.retain(|a| match a.finished_at {
            Some(done) => now.saturating_duration_since(done) < timeout,
            None => true,
        });
        self.actions.len() != before
    }

    /// Most recently finished action, for the status line
    #[must_use]
    pub fn latest_finished(&self) -> Option<&PendingAction> {
        self.actions
            .iter()
            .filter(|a| a.is_finished())
            .max_by_key(|a| a.finished_at)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
