//! Job state enum and the mapping from Slurm state strings.
//!
//! Slurm reports a base state plus optional flags (e.g. `["RUNNING", "COMPLETING"]`).
//! The dashboard collapses these into a small closed enum. Unrecognized strings map
//! to `Unknown` so scheduler output drift never breaks reconciliation.

// ============================================================================
// Job State Priority
// ============================================================================

/// Priority order for job state strings when several are reported together.
///
/// Each entry is `(state, &[variants])` where variants are the Slurm strings
/// (full and short codes) mapping to that state. Earlier entries win, so flags
/// such as COMPLETING take precedence over the base state.
///
/// Reference: https://slurm.schedmd.com/job_state_codes.html
const JOB_STATE_PRIORITY: &[(JobState, &[&str])] = &[
    // Flags first
    (JobState::Completing, &["COMPLETING", "CG"]),
    (JobState::Cancelling, &["CANCELLED", "CA"]),
    // Active base states
    (JobState::Running, &["RUNNING", "R"]),
    (JobState::Pending, &["PENDING", "PD"]),
    (JobState::Suspended, &["SUSPENDED", "S"]),
    // Terminal states
    (JobState::Completed, &["COMPLETED", "CD"]),
    (
        JobState::Failed,
        &[
            "FAILED",
            "F",
            "TIMEOUT",
            "TO",
            "NODE_FAIL",
            "NF",
            "BOOT_FAIL",
            "BF",
            "OUT_OF_MEMORY",
            "OOM",
            "DEADLINE",
            "DL",
            "PREEMPTED",
            "PR",
        ],
    ),
];

// ============================================================================
// Job State Enum
// ============================================================================

/// Job state as shown by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobState {
    Pending,
    Running,
    Suspended,
    Completing,
    Cancelling,
    Completed,
    Failed,
    #[default]
    Unknown,
}

impl JobState {
    /// Create a JobState from Slurm's state list, honoring flag precedence.
    #[must_use]
    pub fn from_slurm_states<S: AsRef<str>>(states: &[S]) -> Self {
        let tokens: Vec<&str> = states
            .iter()
            .filter_map(|s| s.as_ref().split_whitespace().next())
            .collect();

        JOB_STATE_PRIORITY
            .iter()
            .find(|(_, variants)| tokens.iter().any(|t| variants.contains(t)))
            .map(|(state, _)| *state)
            .unwrap_or_default()
    }

    /// Create a JobState from a single state string.
    ///
    /// Handles both full names (e.g., "RUNNING") and short codes (e.g., "R").
    /// Also handles state strings with trailing info like "CANCELLED by 12345".
    #[must_use]
    pub fn from_state_string(state: &str) -> Self {
        Self::from_slurm_states(&[state])
    }

    /// Return the display name of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Suspended => "SUSPENDED",
            Self::Completing => "COMPLETING",
            Self::Cancelling => "CANCELLING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Terminal states carry an exit code and will age out of the queue.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Jobs that will not run again and only linger until they age out.
    ///
    /// A bare CANCELLED is final; a cancelled job still tearing down reports
    /// COMPLETING as well and maps to `Completing`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelling)
    }

    /// States in which the job can still be cancelled meaningfully.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running | Self::Suspended)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
