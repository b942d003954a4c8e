//! # Crashtab Core
//!
//! Scheduling core for the crash-report platform's periodic maintenance
//! and ETL jobs.
//!
//! ## Architecture
//!
//! - **Schedule Calculator**: frequency/anchor parsing and next-run arithmetic
//! - **Job Registry**: handler table and ordered job-entry parsing
//! - **State Store**: durable per-job run history with an optional mirror
//! - **Dependency Resolver**: recency/success gating between jobs
//! - **Orchestrator**: the sequential per-pass control loop
//! - **Introspection**: job listing and configuration dry runs
//!
//! The core owns no timer and no main loop; the hosting process invokes a
//! pass whenever its external trigger fires.

pub mod config;
pub mod deps;
pub mod error;
pub mod introspect;
pub mod jobs;
pub mod mirror;
pub mod orchestrator;
pub mod registry;
pub mod schedule;
pub mod state;

pub use error::{Result, SchedulerError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::deps::{check_dependencies, DependencyStatus, UnmetReason};
    pub use crate::error::{Result, SchedulerError};
    pub use crate::introspect::{configtest, list_jobs, render_job_list, ConfigReport, JobReport};
    pub use crate::jobs::{Job, JobContext, JobEnv, JobError, JobResult};
    pub use crate::mirror::{MemoryMirror, PostgresMirror, StateMirror};
    pub use crate::orchestrator::{JobOutcome, Orchestrator, PassEntry};
    pub use crate::registry::{JobHandlers, JobRegistry, JobSpec};
    pub use crate::schedule::{next_run, validate_schedule, AnchorTime, Frequency};
    pub use crate::state::{RunRecord, StateStore};
}
