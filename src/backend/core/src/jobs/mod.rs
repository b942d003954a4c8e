//! Job definitions for the crashtab scheduler.
//!
//! - **Job trait**: the single entry point every scheduled job implements,
//!   with its name and dependency declaration
//! - **JobContext**: per-run context handed to the body (previous run
//!   record, host-supplied execution environment)
//! - **JobError**: the structured, serializable failure a job body reports
//! - **Built-in jobs**: the platform's own maintenance jobs
//!
//! Job bodies are external collaborators as far as the orchestrator is
//! concerned: they signal success by returning `Ok(())` and failure with a
//! `JobError`, and the orchestrator records either without letting a
//! failure escape the pass.

pub mod job;

pub use job::{Job, JobContext, JobEnv, JobError, JobResult};

// Built-in platform maintenance jobs
mod builtin;
pub use builtin::{
    CleanupOldCrashReportsJob, FetchAdiJob, MatviewRefreshJob, WeeklyReportsPartitionsJob,
};
