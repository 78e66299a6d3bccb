//! Scheduler gateway contract.
//!
//! The engine talks to the scheduler only through [`SchedulerGateway`]. Calls
//! are synchronous and always run on a blocking worker, never on the event
//! loop. The gateway performs no retries; the poll loop retries on its next
//! tick and actions surface failures per target.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{JobId, JobRecord};

/// Typed gateway failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Job id unknown, typically because it already finished and aged out
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Transport failure or timeout
    #[error("scheduler unavailable: {0}")]
    Unavailable(String),

    /// Malformed scheduler output
    #[error("unparseable response: {0}")]
    Unparseable(String),
}

impl GatewayError {
    /// Short label for the status bar
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            GatewayError::NotFound(_) => "NotFound",
            GatewayError::PermissionDenied(_) => "PermissionDenied",
            GatewayError::Unavailable(_) => "Unavailable",
            GatewayError::Unparseable(_) => "Unparseable",
        }
    }
}

/// Which log file to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl LogStream {
    /// Key under which `scontrol show job` reports the path
    #[must_use]
    pub fn detail_key(self) -> &'static str {
        match self {
            LogStream::Stdout => "StdOut",
            LogStream::Stderr => "StdErr",
        }
    }
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogStream::Stdout => f.write_str("stdout"),
            LogStream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Ordered `Key=Value` pairs describing one job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetails {
    pub fields: Vec<(String, String)>,
}

impl JobDetails {
    /// First value reported for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Owning user, from `UserId=alice(1000)`
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.get("UserId")
            .and_then(|v| v.split('(').next())
            .filter(|u| !u.is_empty())
    }
}

/// Adapter boundary to the scheduler.
///
/// Implementations must tolerate concurrent outstanding calls (list, cancel
/// and fetch-log at the same time).
pub trait SchedulerGateway: Send + Sync + 'static {
    fn list_jobs(&self, user: &str) -> Result<Vec<JobRecord>, GatewayError>;

    fn cancel_job(&self, id: &JobId) -> Result<(), GatewayError>;

    fn fetch_log(&self, id: &JobId, stream: LogStream) -> Result<String, GatewayError>;

    fn job_details(&self, id: &JobId) -> Result<JobDetails, GatewayError>;

    /// Startup connectivity check; failure here is fatal
    fn check_connection(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Parse `scontrol show job` output into ordered pairs.
///
/// Fields are whitespace separated `Key=Value` tokens. A token without `=`
/// continues the previous value (e.g. a command line containing spaces).
#[must_use]
pub fn parse_scontrol_output(output: &str) -> JobDetails {
    let mut fields: Vec<(String, String)> = Vec::new();

    for token in output.split_whitespace() {
        match token.split_once('=') {
            Some((key, value)) if !key.is_empty() && !key.contains('/') => {
                fields.push((key.to_string(), value.to_string()));
            }
            _ => {
                if let Some((_, last)) = fields.last_mut() {
                    last.push(' ');
                    last.push_str(token);
                }
            }
        }
    }

    JobDetails { fields }
}

/// Resolve the log file path for a job.
///
/// Uses `StdOut`/`StdErr` when set; `(null)` or missing falls back to
/// `<WorkDir>/slurm-<id>.out`, which is where Slurm writes by default.
/// Relative paths are taken from `WorkDir`.
#[must_use]
pub fn resolve_log_path(details: &JobDetails, id: &JobId, stream: LogStream) -> PathBuf {
    let work_dir = details
        .get("WorkDir")
        .filter(|d| !d.is_empty() && *d != "(null)")
        .unwrap_or(".");

    let configured = details
        .get(stream.detail_key())
        .filter(|p| !p.is_empty() && *p != "(null)");

    match configured {
        Some(raw) => {
            let expanded = expand_placeholders(raw, id, details);
            let path = PathBuf::from(expanded);
            if path.is_absolute() {
                path
            } else {
                Path::new(work_dir).join(path)
            }
        }
        None => Path::new(work_dir).join(format!("slurm-{}.out", id)),
    }
}

/// Expand the filename patterns Slurm leaves unexpanded in some releases
fn expand_placeholders(raw: &str, id: &JobId, details: &JobDetails) -> String {
    let (array_base, array_task) = match id.as_str().split_once('_') {
        Some((base, task)) => (base, task),
        None => (id.as_str(), ""),
    };

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('j') => out.push_str(id.as_str()),
            Some('A') => out.push_str(array_base),
            Some('a') => out.push_str(array_task),
            Some('u') => out.push_str(details.user().unwrap_or("")),
            Some('x') => out.push_str(details.get("JobName").unwrap_or("")),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Keep the last `max_lines` lines of `text`.
#[must_use]
pub fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
