//! The job-body contract: trait, execution context and structured errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

use crate::state::RunRecord;

// ═══════════════════════════════════════════════════════════════════════════════
// Job Error
// ═══════════════════════════════════════════════════════════════════════════════

/// Structured failure reported by a job body.
///
/// Persisted verbatim into the job's run record (`last_error`) so the
/// failure can be reconstructed later: a failure kind, a human message and
/// optional JSON context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    /// Failure kind, e.g. "DatabaseError", "Panic"
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Additional reconstructable context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl JobError {
    /// Create a new job error.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            context: None,
        }
    }

    /// Attach JSON context.
    pub fn with_context(mut self, context: impl Serialize) -> Self {
        self.context = serde_json::to_value(context).ok();
        self
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for JobError {}

impl From<sqlx::Error> for JobError {
    fn from(error: sqlx::Error) -> Self {
        Self::new("DatabaseError", error.to_string())
    }
}

impl From<anyhow::Error> for JobError {
    fn from(error: anyhow::Error) -> Self {
        Self::new("Error", format!("{error:#}"))
    }
}

/// Result type for job execution.
pub type JobResult = std::result::Result<(), JobError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Execution Environment & Context
// ═══════════════════════════════════════════════════════════════════════════════

/// Domain-specific execution environment supplied by the hosting
/// application, not by the scheduling core.
#[derive(Clone, Default)]
pub struct JobEnv {
    /// Database handle for jobs that run stored procedures or cleanup
    /// queries against the crash store.
    pub db: Option<PgPool>,
}

impl JobEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_db(mut self, pool: PgPool) -> Self {
        self.db = Some(pool);
        self
    }
}

/// Context passed to a job body for one execution.
pub struct JobContext {
    job_name: String,
    previous: Option<RunRecord>,
    env: JobEnv,
}

impl JobContext {
    pub fn new(job_name: impl Into<String>, previous: Option<RunRecord>, env: JobEnv) -> Self {
        Self {
            job_name: job_name.into(),
            previous,
            env,
        }
    }

    /// The name of the job being executed.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// The job's run record from before this execution, if it has one.
    pub fn previous_run(&self) -> Option<&RunRecord> {
        self.previous.as_ref()
    }

    /// Host-supplied database handle, if configured.
    pub fn db(&self) -> Option<&PgPool> {
        self.env.db.as_ref()
    }

    /// Log a message associated with this job.
    pub fn log_info(&self, message: &str) {
        tracing::info!(job = %self.job_name, message);
    }

    /// Log a warning associated with this job.
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(job = %self.job_name, message);
    }

    /// Log an error associated with this job.
    pub fn log_error(&self, message: &str) {
        tracing::error!(job = %self.job_name, message);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// The trait every scheduled job implements.
///
/// One execution entry point; anything extra a job needs (a database
/// handle, a target date) arrives through [`JobContext`] as typed data
/// rather than through a class hierarchy.
#[async_trait]
pub trait Job: Send + Sync {
    /// Unique identifier for this job; the key in the state store and the
    /// name used in `run-one`.
    fn name(&self) -> &'static str;

    /// Names of jobs that must have run recently and cleanly before this
    /// one is allowed to execute.
    fn depends_on(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Execute the job.
    ///
    /// # Errors
    ///
    /// Return a [`JobError`] on failure. The orchestrator records it in the
    /// run record; it does not abort the pass.
    async fn execute(&self, ctx: &JobContext) -> JobResult;
}
