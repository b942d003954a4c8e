//! Dependency gating: decides whether a job's prerequisites are satisfied
//! from the run history in the state store.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::registry::JobSpec;
use crate::state::StateStore;

/// Why a dependency blocked a job this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmetReason {
    /// The dependency has no run record at all.
    NeverRun,
    /// The dependency's last attempt ended in an error.
    ErroredLastRun,
    /// The dependency is itself due right now, i.e. it has not executed
    /// since it was last due.
    NotRecentlyRun,
}

impl fmt::Display for UnmetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeverRun => write!(f, "never run"),
            Self::ErroredLastRun => write!(f, "errored last run"),
            Self::NotRecentlyRun => write!(f, "not recently run"),
        }
    }
}

/// Outcome of a dependency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    Satisfied,
    Unsatisfied {
        dependency: String,
        reason: UnmetReason,
    },
}

impl DependencyStatus {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Check every dependency of `spec` against the state store.
///
/// All dependencies must be simultaneously satisfied: present in the
/// store, error-free on their last run, and not currently due. The first
/// unmet dependency (in declaration order) is reported.
pub fn check_dependencies(
    spec: &JobSpec,
    store: &StateStore,
    now: DateTime<Utc>,
) -> DependencyStatus {
    for dependency in &spec.depends_on {
        let reason = match store.get(dependency) {
            None => Some(UnmetReason::NeverRun),
            Some(record) if record.last_error.is_some() => Some(UnmetReason::ErroredLastRun),
            Some(record) if record.next_run <= now => Some(UnmetReason::NotRecentlyRun),
            Some(_) => None,
        };
        if let Some(reason) = reason {
            return DependencyStatus::Unsatisfied {
                dependency: dependency.clone(),
                reason,
            };
        }
    }
    DependencyStatus::Satisfied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{Job, JobContext, JobError, JobResult};
    use crate::registry::{JobHandlers, JobRegistry};
    use crate::state::{RunRecord, StateStore};
    use async_trait::async_trait;
    use chrono::Duration;

    struct Stub(&'static str, Vec<&'static str>);

    #[async_trait]
    impl Job for Stub {
        fn name(&self) -> &'static str {
            self.0
        }
        fn depends_on(&self) -> Vec<&'static str> {
            self.1.clone()
        }
        async fn execute(&self, _ctx: &JobContext) -> JobResult {
            Ok(())
        }
    }

    fn spec_depending_on_upstream() -> JobSpec {
        let mut handlers = JobHandlers::new();
        handlers.register(Stub("upstream", vec![]));
        handlers.register(Stub("downstream", vec!["upstream"]));
        let registry = JobRegistry::build(["downstream|1d"], &handlers).unwrap();
        registry.jobs()[0].clone()
    }

    async fn empty_store() -> StateStore {
        let dir = tempfile::tempdir().unwrap();
        StateStore::load(dir.path().join("state.json"), None)
            .await
            .unwrap()
    }

    fn fresh_record(now: DateTime<Utc>) -> RunRecord {
        RunRecord {
            first_run: now,
            last_run: now,
            last_success: Some(now),
            next_run: now + Duration::days(1),
            last_error: None,
            error_count: 0,
            depends_on: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_no_dependencies_always_satisfied() {
        let mut handlers = JobHandlers::new();
        handlers.register(Stub("solo", vec![]));
        let registry = JobRegistry::build(["solo|1h"], &handlers).unwrap();
        let store = empty_store().await;

        assert!(check_dependencies(&registry.jobs()[0], &store, Utc::now()).is_satisfied());
    }

    #[tokio::test]
    async fn test_never_run_dependency() {
        let spec = spec_depending_on_upstream();
        let store = empty_store().await;

        assert_eq!(
            check_dependencies(&spec, &store, Utc::now()),
            DependencyStatus::Unsatisfied {
                dependency: "upstream".to_string(),
                reason: UnmetReason::NeverRun,
            }
        );
    }

    #[tokio::test]
    async fn test_errored_dependency() {
        let spec = spec_depending_on_upstream();
        let mut store = empty_store().await;
        let now = Utc::now();

        let mut record = fresh_record(now);
        record.last_error = Some(JobError::new("Error", "boom"));
        record.error_count = 1;
        store.set("upstream", record);

        assert_eq!(
            check_dependencies(&spec, &store, now),
            DependencyStatus::Unsatisfied {
                dependency: "upstream".to_string(),
                reason: UnmetReason::ErroredLastRun,
            }
        );
    }

    #[tokio::test]
    async fn test_stale_dependency() {
        let spec = spec_depending_on_upstream();
        let mut store = empty_store().await;
        let now = Utc::now();

        // Upstream ran two days ago and is overdue again.
        let mut record = fresh_record(now - Duration::days(2));
        record.next_run = now - Duration::days(1);
        store.set("upstream", record);

        assert_eq!(
            check_dependencies(&spec, &store, now),
            DependencyStatus::Unsatisfied {
                dependency: "upstream".to_string(),
                reason: UnmetReason::NotRecentlyRun,
            }
        );
    }

    #[tokio::test]
    async fn test_recently_run_dependency_satisfies() {
        let spec = spec_depending_on_upstream();
        let mut store = empty_store().await;
        let now = Utc::now();

        store.set("upstream", fresh_record(now));
        assert!(check_dependencies(&spec, &store, now).is_satisfied());
    }
}
