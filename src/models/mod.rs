//! Data models for Slurm JSON responses and application configuration.
//!
//! This module provides the job record the engine reconciles, the state
//! mapping from Slurm strings, the squeue wire types, and configuration.

mod config;
mod job;
mod slurm_responses;
mod state;
mod time;

pub use config::{
    AppConfig, BehaviorConfig, DisplayConfig, MAX_REFRESH_INTERVAL, MIN_REFRESH_INTERVAL,
    RefreshConfig, SystemConfig, is_valid_refresh_interval,
};
pub use job::{JobId, JobRecord, Resources};
pub use slurm_responses::{SlurmResponse, SqueueJob, SqueueResponse, parse_gpu_count};
pub use state::JobState;
pub use time::TimeValue;
