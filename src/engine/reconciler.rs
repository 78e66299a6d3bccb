//! Snapshot reconciliation.
//!
//! Each successful poll replaces the view model wholesale: records are keyed by
//! job id, diffed against the previous view and re-sorted by the stable key.
//! A failed poll keeps the last good records and only marks them stale.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::gateway::GatewayError;
use crate::models::{JobId, JobRecord};

/// Why the displayed data may be out of date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleInfo {
    pub error: GatewayError,
    /// When the most recent failed poll resolved
    pub at: DateTime<Utc>,
    /// Failed polls since the last success
    pub failures: u32,
}

/// Ordered, displayable snapshot of jobs as of the latest successful poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewModel {
    pub jobs: Vec<JobRecord>,
    /// Bumped on every successful poll, never on failure
    pub generation: u64,
    pub stale: Option<StaleInfo>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl ViewModel {
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    #[must_use]
    pub fn index_of(&self, id: &JobId) -> Option<usize> {
        self.jobs.iter().position(|job| &job.id == id)
    }

    #[must_use]
    pub fn get(&self, id: &JobId) -> Option<&JobRecord> {
        self.jobs.iter().find(|job| &job.id == id)
    }

    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<&JobId> {
        self.jobs.get(index).map(|job| &job.id)
    }

    #[must_use]
    pub fn contains(&self, id: &JobId) -> bool {
        self.index_of(id).is_some()
    }
}

/// Difference between two consecutive successful snapshots.
///
/// Each list is sorted by job id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub added: Vec<JobId>,
    pub removed: Vec<JobId>,
    pub changed: Vec<JobId>,
}

impl Diff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Owns the current view model and turns poll results into new ones
#[derive(Debug)]
pub struct Reconciler {
    view: Arc<ViewModel>,
    hide_finished: bool,
}

impl Reconciler {
    pub fn new(hide_finished: bool) -> Self {
        Self {
            view: Arc::new(ViewModel::default()),
            hide_finished,
        }
    }

    #[must_use]
    pub fn view(&self) -> &Arc<ViewModel> {
        &self.view
    }

    /// Reconcile a successful poll into a new view model.
    pub fn apply_success(&mut self, records: Vec<JobRecord>, now: DateTime<Utc>) -> Diff {
        let mut incoming: HashMap<JobId, JobRecord> = HashMap::with_capacity(records.len());
        for record in records {
            if self.hide_finished && record.state.is_finished() {
                continue;
            }
            if let Some(previous) = incoming.insert(record.id.clone(), record) {
                warn!(job_id = %previous.id, "duplicate job id in one poll, keeping the last");
            }
        }

        let previous: HashMap<&JobId, &JobRecord> =
            self.view.jobs.iter().map(|job| (&job.id, job)).collect();

        let mut diff = Diff::default();
        for (id, record) in &incoming {
            match previous.get(id) {
                None => diff.added.push(id.clone()),
                Some(old) if *old != record => diff.changed.push(id.clone()),
                Some(_) => {}
            }
        }
        diff.removed = previous
            .keys()
            .filter(|id| !incoming.contains_key(**id))
            .map(|id| (*id).clone())
            .collect();

        diff.added.sort();
        diff.removed.sort();
        diff.changed.sort();

        let mut jobs: Vec<JobRecord> = incoming.into_values().collect();
        jobs.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let generation = self.view.generation + 1;
        debug!(
            generation,
            jobs = jobs.len(),
            added = diff.added.len(),
            removed = diff.removed.len(),
            changed = diff.changed.len(),
            "reconciled poll"
        );

        self.view = Arc::new(ViewModel {
            jobs,
            generation,
            stale: None,
            refreshed_at: Some(now),
        });

        diff
    }

    /// Record a failed poll; the displayed jobs and generation stay as they were.
    pub fn apply_failure(&mut self, error: GatewayError, now: DateTime<Utc>) {
        let failures = self.view.stale.as_ref().map_or(0, |s| s.failures) + 1;
        warn!(error = %error, failures, "poll failed, keeping last good view");

        let mut view = (*self.view).clone();
        view.stale = Some(StaleInfo {
            error,
            at: now,
            failures,
        });
        self.view = Arc::new(view);
    }
}
