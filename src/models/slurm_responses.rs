//! Slurm API response wrappers.
//!
//! Deserialization types for `squeue --json` and the conversion of a raw
//! squeue entry into the dashboard's [`JobRecord`].

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::job::{JobId, JobRecord, Resources};
use super::state::JobState;
use super::time::TimeValue;

/// Trait for Slurm command responses that have an errors field.
///
/// Lets the gateway check for scheduler-reported errors generically.
pub trait SlurmResponse {
    fn errors(&self) -> Vec<String>;
}

/// An error entry; older releases emit strings, newer ones objects
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SlurmErrorEntry {
    Text(String),
    Detailed {
        #[serde(default)]
        error: String,
        #[serde(default)]
        description: String,
    },
}

impl SlurmErrorEntry {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            SlurmErrorEntry::Text(s) => s.clone(),
            SlurmErrorEntry::Detailed { error, description } => {
                if description.is_empty() {
                    error.clone()
                } else if error.is_empty() {
                    description.clone()
                } else {
                    format!("{}: {}", error, description)
                }
            }
        }
    }
}

/// Slurm API response wrapper for squeue
#[derive(Debug, Deserialize)]
pub struct SqueueResponse {
    #[serde(default)]
    pub jobs: Vec<SqueueJob>,

    #[serde(default)]
    pub errors: Vec<SlurmErrorEntry>,
}

impl SlurmResponse for SqueueResponse {
    fn errors(&self) -> Vec<String> {
        self.errors.iter().map(SlurmErrorEntry::message).collect()
    }
}

/// `job_state` is a string on older Slurm, a list of base state plus flags on newer
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StateField {
    One(String),
    Many(Vec<String>),
}

impl Default for StateField {
    fn default() -> Self {
        StateField::Many(Vec::new())
    }
}

impl StateField {
    fn as_slice(&self) -> &[String] {
        match self {
            StateField::One(s) => std::slice::from_ref(s),
            StateField::Many(v) => v,
        }
    }
}

/// One entry of `squeue --json`; only the fields the dashboard uses
#[derive(Debug, Clone, Deserialize)]
pub struct SqueueJob {
    #[serde(default)]
    pub job_id: TimeValue,

    #[serde(default)]
    pub array_job_id: TimeValue,

    #[serde(default)]
    pub array_task_id: TimeValue,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub partition: String,

    #[serde(default)]
    pub job_state: StateField,

    #[serde(default)]
    pub state_reason: String,

    #[serde(default)]
    pub submit_time: TimeValue,

    #[serde(default)]
    pub start_time: TimeValue,

    #[serde(default)]
    pub nodes: String,

    #[serde(default)]
    pub cpus: TimeValue,

    #[serde(default)]
    pub memory_per_node: TimeValue,

    #[serde(default)]
    pub memory_per_cpu: TimeValue,

    #[serde(default)]
    pub tres_req_str: String,

    #[serde(default)]
    pub tres_per_node: String,

    #[serde(default)]
    pub exit_code: serde_json::Value,

    #[serde(default)]
    pub standard_output: String,

    #[serde(default)]
    pub standard_error: String,
}

impl SqueueJob {
    /// Job id as the scheduler prints it, `base_task` for array tasks.
    ///
    /// Returns `None` for entries without a usable id.
    #[must_use]
    pub fn job_id(&self) -> Option<JobId> {
        let id = self.job_id.nonzero()?;
        match (self.array_job_id.nonzero(), self.array_task_id.value()) {
            (Some(base), Some(task)) if base != id || task > 0 => {
                Some(JobId::new(format!("{}_{}", base, task)))
            }
            _ => Some(JobId::new(id.to_string())),
        }
    }

    /// Convert into a [`JobRecord`], computing elapsed time against `now`.
    #[must_use]
    pub fn to_record(&self, now: DateTime<Utc>) -> Option<JobRecord> {
        let id = self.job_id()?;
        let state = JobState::from_slurm_states(self.job_state.as_slice());
        let start_time = self.start_time.to_timestamp();

        let elapsed_secs = match (state, start_time) {
            (JobState::Pending, _) | (_, None) => 0,
            (_, Some(start)) => (now - start).num_seconds().max(0) as u64,
        };

        let cpus = self.cpus.value().unwrap_or(0) as u32;
        let memory_mb = match (self.memory_per_node.nonzero(), self.memory_per_cpu.nonzero()) {
            (Some(per_node), _) => per_node,
            (None, Some(per_cpu)) => per_cpu * u64::from(cpus.max(1)),
            (None, None) => 0,
        };

        let gpus = parse_gpu_count(&self.tres_req_str)
            .or_else(|| parse_gpu_count(&self.tres_per_node))
            .unwrap_or(0);

        let exit_code = if state.is_terminal() {
            parse_exit_code(&self.exit_code)
        } else {
            None
        };

        Some(JobRecord {
            id,
            name: self.name.clone(),
            partition: self.partition.clone(),
            state,
            state_reason: self.state_reason.clone(),
            submit_time: self.submit_time.to_timestamp(),
            start_time,
            elapsed_secs,
            node_list: self.nodes.clone(),
            resources: Resources {
                cpus,
                memory_mb,
                gpus,
            },
            exit_code,
            stdout_path: non_empty(&self.standard_output),
            stderr_path: non_empty(&self.standard_error),
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Extract a GPU count from a TRES string.
///
/// Handles `gres/gpu=2`, `gres/gpu:a100=4`, `gres:gpu:2` and `gres/gpu:a100:4`.
#[must_use]
pub fn parse_gpu_count(tres: &str) -> Option<u32> {
    tres.split(',')
        .map(str::trim)
        .filter(|item| item.contains("gpu"))
        .find_map(|item| {
            let tail = item.rsplit(['=', ':']).next()?;
            tail.parse::<u32>().ok()
        })
}

/// Exit code is either a bare integer or `{"return_code": {..}, ...}`
fn parse_exit_code(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().map(|n| n as i32),
        serde_json::Value::Object(map) => match map.get("return_code")? {
            serde_json::Value::Number(n) => n.as_i64().map(|n| n as i32),
            serde_json::Value::Object(rc) => {
                let set = rc.get("set").and_then(|v| v.as_bool()).unwrap_or(true);
                if set {
                    rc.get("number").and_then(|v| v.as_i64()).map(|n| n as i32)
                } else {
                    None
                }
            }
            _ => None,
        },
        _ => None,
    }
}
