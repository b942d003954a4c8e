//! The control loop: per-pass evaluation and execution of registered jobs.
//!
//! One pass walks every job in registration order and, per job: due check,
//! dependency check, execution, record update, immediate save. Skips
//! mutate nothing. A job failure (error or panic) is captured into the run
//! record and never aborts the pass; subsequent jobs are still evaluated.
//!
//! The orchestrator owns no timer. It is invoked on demand by an external
//! periodic trigger and returns after one pass; re-invocation is the only
//! form of waiting. Jobs run strictly sequentially because a job's success
//! within a pass can unblock a later job's dependency check in the same
//! pass. No timeout is placed around job execution: a hung job blocks the
//! whole pass (accepted limitation).

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::deps::{check_dependencies, DependencyStatus, UnmetReason};
use crate::error::{Result, SchedulerError};
use crate::jobs::{JobContext, JobEnv, JobError};
use crate::registry::{JobRegistry, JobSpec};
use crate::schedule::next_run;
use crate::state::{RunRecord, StateStore};

/// What happened to one job during one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job's `next_run` is still in the future.
    SkippedNotDue,
    /// A prerequisite was unmet; nothing was executed or recorded.
    SkippedDependencyUnmet {
        dependency: String,
        reason: UnmetReason,
    },
    /// The body ran and returned success.
    RanSuccess,
    /// The body ran and failed; the failure is recorded in the run record.
    RanFailure,
}

impl JobOutcome {
    /// True when the job body actually executed.
    pub fn ran(&self) -> bool {
        matches!(self, Self::RanSuccess | Self::RanFailure)
    }
}

/// One job's entry in a pass summary.
#[derive(Debug, Clone)]
pub struct PassEntry {
    pub name: String,
    pub outcome: JobOutcome,
}

/// The scheduler's control loop over a registry, a state store and the
/// host-supplied execution environment.
///
/// Constructed explicitly by the caller from an already-loaded
/// [`StateStore`]; there is no hidden process-wide instance.
pub struct Orchestrator {
    registry: JobRegistry,
    state: StateStore,
    env: JobEnv,
}

impl Orchestrator {
    pub fn new(registry: JobRegistry, state: StateStore, env: JobEnv) -> Self {
        Self {
            registry,
            state,
            env,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Run one pass over every registered job, in registration order.
    ///
    /// Never fails for job-body errors; `Err` means a state-persistence
    /// problem, which aborts the pass rather than risk losing history.
    pub async fn run_all(&mut self) -> Result<Vec<PassEntry>> {
        let mut pass = Vec::with_capacity(self.registry.len());
        for index in 0..self.registry.len() {
            let spec = self.registry.jobs()[index].clone();
            let outcome = self.run_spec(&spec, false).await?;
            pass.push(PassEntry {
                name: spec.name,
                outcome,
            });
        }
        Ok(pass)
    }

    /// Apply the per-job sequence to a single named job.
    ///
    /// `force` bypasses the due check and dependency gating; execution,
    /// record update and save happen identically.
    pub async fn run_one(&mut self, name: &str, force: bool) -> Result<JobOutcome> {
        let spec = self
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| SchedulerError::JobNotFound(name.to_string()))?;
        self.run_spec(&spec, force).await
    }

    async fn run_spec(&mut self, spec: &JobSpec, force: bool) -> Result<JobOutcome> {
        let now = Utc::now();

        if !force {
            let due = match self.state.get(&spec.name) {
                None => true,
                Some(record) => record.next_run <= now,
            };
            if !due {
                debug!(job = %spec.name, "skipping, not due");
                return Ok(JobOutcome::SkippedNotDue);
            }

            if let DependencyStatus::Unsatisfied { dependency, reason } =
                check_dependencies(spec, &self.state, now)
            {
                info!(
                    job = %spec.name,
                    dependency = %dependency,
                    reason = %reason,
                    "skipping, dependency unmet"
                );
                return Ok(JobOutcome::SkippedDependencyUnmet { dependency, reason });
            }
        }

        let outcome = self.execute(spec, now).await;
        self.state.save().await?;
        Ok(outcome)
    }

    /// Execute the job body exactly once and update its run record.
    ///
    /// The body runs inside its own task so a panic surfaces as a join
    /// error and is recorded like any other failure.
    async fn execute(&mut self, spec: &JobSpec, now: DateTime<Utc>) -> JobOutcome {
        info!(job = %spec.name, schedule = %spec.schedule_display(), "running job");
        let started = Instant::now();

        let ctx = JobContext::new(
            spec.name.clone(),
            self.state.get(&spec.name).cloned(),
            self.env.clone(),
        );
        let handler = Arc::clone(&spec.handler);
        let result = match tokio::spawn(async move { handler.execute(&ctx).await }).await {
            Ok(job_result) => job_result,
            Err(join_err) => Err(join_error_to_job_error(join_err)),
        };
        let duration = started.elapsed();

        let next = next_run(now, &spec.frequency, spec.anchor_time.as_ref());
        let mut record = match self.state.get(&spec.name).cloned() {
            Some(mut record) => {
                record.last_run = now;
                record.next_run = next;
                record
            }
            None => RunRecord {
                first_run: now,
                last_run: now,
                last_success: None,
                next_run: next,
                last_error: None,
                error_count: 0,
                depends_on: Vec::new(),
            },
        };
        record.depends_on = spec.depends_on.clone();

        let outcome = match result {
            Ok(()) => {
                record.last_success = Some(now);
                record.last_error = None;
                record.error_count = 0;
                info!(
                    job = %spec.name,
                    duration_ms = duration.as_millis() as u64,
                    next_run = %next,
                    "job succeeded"
                );
                JobOutcome::RanSuccess
            }
            Err(job_error) => {
                record.error_count += 1;
                error!(
                    job = %spec.name,
                    duration_ms = duration.as_millis() as u64,
                    error_count = record.error_count,
                    error = %job_error,
                    "job failed"
                );
                record.last_error = Some(job_error);
                JobOutcome::RanFailure
            }
        };

        self.state.set(spec.name.clone(), record);
        outcome
    }
}

fn join_error_to_job_error(err: tokio::task::JoinError) -> JobError {
    if err.is_panic() {
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "job panicked".to_string());
        JobError::new("Panic", message)
    } else {
        JobError::new("Cancelled", err.to_string())
    }
}
