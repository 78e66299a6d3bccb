//! Slurm implementation of the scheduler gateway.
//!
//! Runs `squeue --json`, `scancel` and `scontrol show job` as child processes.
//! Every invocation is an independent process, so concurrent calls from
//! several workers need no internal queue. Each command runs under a timeout;
//! a child that overstays it is killed and reported as unavailable.

use std::future::Future;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::gateway::{
    GatewayError, JobDetails, LogStream, SchedulerGateway, parse_scontrol_output,
    resolve_log_path, tail_lines,
};
use crate::models::{JobId, JobRecord, SlurmResponse, SqueueResponse, SystemConfig};

/// Only the end of a log is shown; never read more than this from disk
const LOG_READ_LIMIT: u64 = 512 * 1024;

/// How the Slurm binary path was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResolution {
    /// Explicitly configured via config file or environment variable
    Configured,
    /// Found squeue in the user's PATH
    AutoDetected,
    /// Fell back to /usr/bin and squeue was found there
    Fallback,
    /// Fell back to /usr/bin but squeue was NOT found there
    FallbackUnverified,
}

/// Find the directory containing Slurm binaries.
///
/// Resolution order:
/// 1. Explicit path from config, if it is an existing directory.
/// 2. The parent directory of `squeue` found via PATH.
/// 3. `/usr/bin`.
pub fn find_slurm_bin_path(config_path: Option<&Path>) -> (PathBuf, PathResolution) {
    if let Some(path) = config_path {
        if path.is_dir() {
            return (path.to_path_buf(), PathResolution::Configured);
        }
        warn!(
            path = %path.display(),
            "configured slurm_bin_path is not a directory, trying auto-detection"
        );
    }

    if let Ok(squeue_path) = which::which("squeue")
        && let Some(parent) = squeue_path.parent()
    {
        return (parent.to_path_buf(), PathResolution::AutoDetected);
    }

    let fallback_path = PathBuf::from("/usr/bin");
    if fallback_path.join("squeue").exists() {
        (fallback_path, PathResolution::Fallback)
    } else {
        warn!(
            "Slurm binaries not found in PATH or {}",
            fallback_path.display()
        );
        (fallback_path, PathResolution::FallbackUnverified)
    }
}

/// Slurm version information
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlurmVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SlurmVersion {
    /// First release with `squeue --json` (21.08)
    pub const MIN_JSON_VERSION: SlurmVersion = SlurmVersion {
        major: 21,
        minor: 8,
        patch: 0,
    };

    #[must_use]
    pub fn supports_json(&self) -> bool {
        *self >= Self::MIN_JSON_VERSION
    }
}

impl std::fmt::Display for SlurmVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for SlurmVersion {
    type Err = String;

    /// Accepts "slurm 24.11.0", "slurm-24.05.1" and "24.11.0"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid Slurm version string: '{}'", s.trim());

        let version_part = s
            .trim()
            .split(|c: char| c.is_whitespace() || c == '-')
            .find(|part| part.starts_with(|c: char| c.is_ascii_digit()))
            .ok_or_else(invalid)?;

        let mut parts = version_part.split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);

        Ok(SlurmVersion {
            major,
            minor,
            patch,
        })
    }
}

/// Gateway backed by the Slurm command-line tools
#[derive(Debug, Clone)]
pub struct SlurmGateway {
    slurm_bin_path: PathBuf,
    resolution: PathResolution,
    timeout: Duration,
    log_tail_lines: usize,
}

impl SlurmGateway {
    pub fn new(system: &SystemConfig, log_tail_lines: usize) -> Self {
        let (slurm_bin_path, resolution) = find_slurm_bin_path(system.slurm_bin_path.as_deref());
        debug!(
            path = %slurm_bin_path.display(),
            resolution = ?resolution,
            "resolved Slurm binary path"
        );
        Self {
            slurm_bin_path,
            resolution,
            timeout: Duration::from_secs(system.command_timeout_secs),
            log_tail_lines,
        }
    }

    #[must_use]
    pub fn bin_path(&self) -> &Path {
        &self.slurm_bin_path
    }

    fn command(&self, binary: &str) -> Command {
        Command::new(self.slurm_bin_path.join(binary))
    }

    /// Run a command and return its output, mapping failure exits through stderr
    fn run_checked(&self, cmd: Command, label: &str) -> Result<Output, GatewayError> {
        let output = run_with_timeout(cmd, label, self.timeout)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(
                command = label,
                exit_code = ?output.status.code(),
                stderr = %stderr.trim(),
                "Slurm command failed"
            );
            return Err(classify_failure(label, &stderr));
        }
        Ok(output)
    }

    fn read_log_tail(&self, path: &Path) -> Result<String, GatewayError> {
        let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                GatewayError::NotFound(format!("log file not found yet: {}", path.display()))
            }
            std::io::ErrorKind::PermissionDenied => {
                GatewayError::PermissionDenied(format!("cannot read {}", path.display()))
            }
            _ => GatewayError::Unavailable(format!("cannot open {}: {}", path.display(), e)),
        })?;

        let io_err = |e: std::io::Error| {
            GatewayError::Unavailable(format!("reading {}: {}", path.display(), e))
        };

        let len = file.metadata().map_err(io_err)?.len();
        let offset = len.saturating_sub(LOG_READ_LIMIT);
        file.seek(SeekFrom::Start(offset)).map_err(io_err)?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(io_err)?;
        let text = String::from_utf8_lossy(&buf);

        // A mid-file start lands inside a line; drop the fragment
        let text: &str = if offset > 0 {
            text.split_once('\n').map_or("", |(_, rest)| rest)
        } else {
            &text
        };

        Ok(tail_lines(text, self.log_tail_lines))
    }
}

impl SchedulerGateway for SlurmGateway {
    fn list_jobs(&self, user: &str) -> Result<Vec<JobRecord>, GatewayError> {
        let mut cmd = self.command("squeue");
        cmd.arg("--json").arg("-u").arg(user);

        let output = self.run_checked(cmd, "squeue")?;
        let response: SqueueResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| GatewayError::Unparseable(format!("squeue JSON: {}", e)))?;

        let errors = response.errors();
        if !errors.is_empty() {
            return Err(classify_failure("squeue", &errors.join("; ")));
        }

        let now = Utc::now();
        Ok(response
            .jobs
            .iter()
            .filter_map(|job| job.to_record(now))
            .collect())
    }

    fn cancel_job(&self, id: &JobId) -> Result<(), GatewayError> {
        let mut cmd = self.command("scancel");
        cmd.arg(id.as_str());

        let output = self.run_checked(cmd, "scancel")?;

        // scancel can exit 0 and still report a per-job error
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("error") {
            return Err(classify_failure("scancel", &stderr));
        }
        Ok(())
    }

    fn fetch_log(&self, id: &JobId, stream: LogStream) -> Result<String, GatewayError> {
        let details = self.job_details(id)?;
        let path = resolve_log_path(&details, id, stream);
        debug!(job_id = %id, %stream, path = %path.display(), "reading job log");
        self.read_log_tail(&path)
    }

    fn job_details(&self, id: &JobId) -> Result<JobDetails, GatewayError> {
        let mut cmd = self.command("scontrol");
        cmd.arg("show").arg("job").arg(id.as_str());

        let output = self.run_checked(cmd, "scontrol")?;
        let details = parse_scontrol_output(&String::from_utf8_lossy(&output.stdout));
        if details.is_empty() {
            return Err(GatewayError::NotFound(format!("no details for job {}", id)));
        }
        Ok(details)
    }

    /// Checks that `squeue` runs and is new enough for `--json`
    fn check_connection(&self) -> Result<(), GatewayError> {
        let mut cmd = self.command("squeue");
        cmd.arg("--version");

        let output = run_with_timeout(cmd, "squeue", self.timeout).map_err(|e| {
            if self.resolution == PathResolution::FallbackUnverified {
                GatewayError::Unavailable(format!(
                    "Slurm binaries not found in PATH or {} (set SKTOP_SLURM_PATH)",
                    self.slurm_bin_path.display()
                ))
            } else {
                e
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GatewayError::Unavailable(format!(
                "squeue --version exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let version: SlurmVersion = text.parse().map_err(GatewayError::Unparseable)?;
        if !version.supports_json() {
            return Err(GatewayError::Unavailable(format!(
                "Slurm {} detected, JSON output requires {} or later",
                version,
                SlurmVersion::MIN_JSON_VERSION
            )));
        }
        debug!(%version, "Slurm connection check passed");
        Ok(())
    }
}

/// Run a command, killing it if it does not exit within `timeout`.
///
/// The child and its pipe readers live inside one future. When the deadline
/// passes that future is dropped, which kills the child, so a grandchild
/// still holding stdout open cannot keep the call waiting.
pub fn run_with_timeout(
    cmd: Command,
    label: &str,
    timeout: Duration,
) -> Result<Output, GatewayError> {
    let mut cmd = tokio::process::Command::from(cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    block_on(async move {
        let child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                GatewayError::Unavailable(format!("{} binary not found", label))
            }
            std::io::ErrorKind::PermissionDenied => {
                GatewayError::PermissionDenied(format!("cannot execute {}", label))
            }
            _ => GatewayError::Unavailable(format!("failed to execute {}: {}", label, e)),
        })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(GatewayError::Unavailable(format!(
                "waiting for {}: {}",
                label, e
            ))),
            Err(_) => {
                warn!(command = label, timeout_secs = timeout.as_secs_f64(), "command timed out");
                Err(GatewayError::Unavailable(format!(
                    "{} timed out after {:.1}s",
                    label,
                    timeout.as_secs_f64()
                )))
            }
        }
    })
}

/// Drive `fut` from synchronous code. Gateway workers run on the blocking
/// pool and reuse the app runtime; startup checks build a small one.
fn block_on<T>(fut: impl Future<Output = Result<T, GatewayError>>) -> Result<T, GatewayError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle.block_on(fut),
        Err(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("cannot start runtime: {}", e)))?
            .block_on(fut),
    }
}

/// Map a Slurm error message to a gateway error kind
#[must_use]
pub fn classify_failure(label: &str, message: &str) -> GatewayError {
    let trimmed = message.trim();
    let lower = trimmed.to_ascii_lowercase();
    let msg = format!("{}: {}", label, trimmed);

    if lower.contains("invalid job id")
        || lower.contains("already completing or completed")
        || lower.contains("does not exist")
    {
        GatewayError::NotFound(msg)
    } else if lower.contains("access denied")
        || lower.contains("permission denied")
        || lower.contains("not authorized")
        || lower.contains("invalid user")
    {
        GatewayError::PermissionDenied(msg)
    } else {
        // "Unable to contact slurm controller", socket timeouts and anything unrecognised
        GatewayError::Unavailable(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_slurm_version_from_str() {
        let version: SlurmVersion = "slurm 24.11.0".parse().unwrap();
        assert_eq!((version.major, version.minor, version.patch), (24, 11, 0));

        let version: SlurmVersion = "slurm-24.05.1".parse().unwrap();
        assert_eq!((version.major, version.minor, version.patch), (24, 5, 1));

        let version: SlurmVersion = "slurm 21.08\n".parse().unwrap();
        assert_eq!((version.major, version.minor, version.patch), (21, 8, 0));
    }

    #[test]
    fn test_slurm_version_from_str_invalid() {
        assert!("not a version".parse::<SlurmVersion>().is_err());
        assert!("".parse::<SlurmVersion>().is_err());
        assert!("slurm".parse::<SlurmVersion>().is_err());
    }

    #[test]
    fn test_slurm_version_supports_json() {
        let v = |major, minor| SlurmVersion {
            major,
            minor,
            patch: 0,
        };
        assert!(v(21, 8).supports_json());
        assert!(v(24, 11).supports_json());
        assert!(!v(21, 7).supports_json());
        assert!(!v(20, 11).supports_json());
        assert_eq!(v(21, 8).to_string(), "21.08.0");
    }

    #[test]
    fn test_classify_failure() {
        let kill_error = |reason: &str| {
            format!("scancel: error: Kill job error on job id 5: {}", reason)
        };
        assert!(matches!(
            classify_failure("scancel", &kill_error("Invalid job id specified")),
            GatewayError::NotFound(_)
        ));
        assert!(matches!(
            classify_failure("scancel", &kill_error("Job/step already completing or completed")),
            GatewayError::NotFound(_)
        ));
        assert!(matches!(
            classify_failure("scancel", &kill_error("Access/permission denied")),
            GatewayError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_failure(
                "squeue",
                "slurm_load_jobs error: Unable to contact slurm controller (connect failure)"
            ),
            GatewayError::Unavailable(_)
        ));
        assert!(matches!(
            classify_failure("squeue", "something new"),
            GatewayError::Unavailable(_)
        ));
    }

    #[test]
    fn test_run_with_timeout_captures_output() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err >&2");
        let output = run_with_timeout(cmd, "sh", Duration::from_secs(10)).unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "out\n");
        assert_eq!(String::from_utf8_lossy(&output.stderr), "err\n");
    }

    #[test]
    fn test_run_with_timeout_kills_slow_child() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let started = Instant::now();
        let err = run_with_timeout(cmd, "sleep", Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(ref m) if m.contains("timed out")));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_timeout_not_held_open_by_grandchild() {
        // The background sleep inherits stdout and outlives the killed shell
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 5 & sleep 5");
        let started = Instant::now();
        let err = run_with_timeout(cmd, "sh", Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(ref m) if m.contains("timed out")));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_with_timeout_on_blocking_worker() {
        let output = tokio::task::spawn_blocking(|| {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg("echo worker");
            run_with_timeout(cmd, "sh", Duration::from_secs(10))
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "worker\n");
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let cmd = Command::new("/nonexistent/sktop-test/squeue");
        let err = run_with_timeout(cmd, "squeue", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[test]
    fn test_read_log_tail_missing_file_is_not_found() {
        let gateway = SlurmGateway {
            slurm_bin_path: PathBuf::from("/usr/bin"),
            resolution: PathResolution::Fallback,
            timeout: Duration::from_secs(1),
            log_tail_lines: 10,
        };
        let err = gateway
            .read_log_tail(Path::new("/nonexistent/sktop-test/slurm-1.out"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(ref m) if m.contains("not found yet")));
    }

    #[test]
    fn test_read_log_tail_keeps_last_lines() {
        let path = std::env::temp_dir().join(format!("sktop-log-test-{}.out", std::process::id()));
        let body: String = (1..=50).map(|i| format!("line {}\n", i)).collect();
        std::fs::write(&path, body).unwrap();

        let gateway = SlurmGateway {
            slurm_bin_path: PathBuf::from("/usr/bin"),
            resolution: PathResolution::Fallback,
            timeout: Duration::from_secs(1),
            log_tail_lines: 3,
        };
        let text = gateway.read_log_tail(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(text, "line 48\nline 49\nline 50");
    }
}
