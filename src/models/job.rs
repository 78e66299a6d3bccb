//! Job identity and the per-poll job record.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::state::JobState;

/// Opaque scheduler-assigned job identifier.
///
/// Stored as the scheduler prints it (`"4242"`, `"4242_7"` for array tasks).
/// Ordering is natural: the leading numeric part compares as a number, so
/// `"99" < "100"`, and the raw string breaks ties.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric_prefix(&self) -> Option<u64> {
        let digits: &str = self
            .0
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .unwrap_or("");
        digits.parse().ok()
    }
}

impl Ord for JobId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric_prefix(), other.numeric_prefix()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for JobId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Requested resources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resources {
    pub cpus: u32,
    pub memory_mb: u64,
    pub gpus: u32,
}

/// A job as reported by one successful poll.
///
/// Never mutated after construction: a later poll produces a new record for the
/// same id, and the reconciler compares the whole field tuple to detect changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub id: JobId,
    pub name: String,
    pub partition: String,
    pub state: JobState,
    pub state_reason: String,
    pub submit_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub elapsed_secs: u64,
    pub node_list: String,
    pub resources: Resources,
    /// Present only in terminal states
    pub exit_code: Option<i32>,
    pub stdout_path: Option<String>,
    pub stderr_path: Option<String>,
}

impl JobRecord {
    /// Minimal record, mostly useful for tests and fakes
    pub fn new(id: impl Into<String>, state: JobState) -> Self {
        Self {
            id: JobId::new(id),
            name: String::new(),
            partition: String::new(),
            state,
            state_reason: String::new(),
            submit_time: None,
            start_time: None,
            elapsed_secs: 0,
            node_list: String::new(),
            resources: Resources::default(),
            exit_code: None,
            stdout_path: None,
            stderr_path: None,
        }
    }

    /// Builder-style setter for the submit time (epoch seconds)
    #[must_use]
    pub fn submitted_at(mut self, epoch: i64) -> Self {
        self.submit_time = DateTime::from_timestamp(epoch, 0);
        self
    }

    /// Stable display order: submit time ascending, then id.
    ///
    /// Jobs without a known submit time sort first so they stay put.
    #[must_use]
    pub fn sort_key(&self) -> (Option<DateTime<Utc>>, &JobId) {
        (self.submit_time, &self.id)
    }

    /// Node list, or the pending reason in parentheses (as squeue prints it)
    #[must_use]
    pub fn location(&self) -> String {
        if self.state == JobState::Pending {
            if self.state_reason.is_empty() || self.state_reason == "None" {
                "(PENDING)".to_string()
            } else {
                format!("({})", self.state_reason)
            }
        } else {
            self.node_list.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_natural_order() {
        let mut ids: Vec<JobId> = ["100", "99", "100_2", "100_10", "abc"]
            .into_iter()
            .map(JobId::from)
            .collect();
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(JobId::as_str).collect();
        assert_eq!(sorted, vec!["99", "100", "100_10", "100_2", "abc"]);
    }

    #[test]
    fn test_sort_key_orders_by_submit_then_id() {
        let a = JobRecord::new("20", JobState::Running).submitted_at(100);
        let b = JobRecord::new("10", JobState::Running).submitted_at(200);
        let c = JobRecord::new("5", JobState::Running).submitted_at(200);
        assert!(a.sort_key() < c.sort_key());
        assert!(c.sort_key() < b.sort_key());
    }

    #[test]
    fn test_location_shows_reason_for_pending() {
        let mut job = JobRecord::new("1", JobState::Pending);
        assert_eq!(job.location(), "(PENDING)");
        job.state_reason = "Priority".to_string();
        assert_eq!(job.location(), "(Priority)");

        job.state = JobState::Running;
        job.node_list = "node[01-02]".to_string();
        assert_eq!(job.location(), "node[01-02]");
    }
}
