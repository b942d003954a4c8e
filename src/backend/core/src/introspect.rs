//! Read-only visibility into the configured jobs and their run history.
//!
//! `list_jobs` pairs every configured job with its run record; `configtest`
//! dry-runs the whole configuration and collects every problem instead of
//! stopping at the first. Neither executes a job or mutates the store.

use chrono::{DateTime, Duration, Utc};
use std::io::Write;

use crate::error::Result;
use crate::registry::{JobHandlers, JobRegistry};
use crate::state::{RunRecord, StateStore};

/// One job's introspection row: descriptor plus run history, if any.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub name: String,
    pub schedule: String,
    pub depends_on: Vec<String>,
    pub record: Option<RunRecord>,
}

/// Collect a report for every configured job, in registry order.
pub fn list_jobs(registry: &JobRegistry, store: &StateStore) -> Vec<JobReport> {
    registry
        .jobs()
        .iter()
        .map(|spec| JobReport {
            name: spec.name.clone(),
            schedule: spec.schedule_display(),
            depends_on: spec.depends_on.clone(),
            record: store.get(&spec.name).cloned(),
        })
        .collect()
}

/// Render the job reports as the text block the CLI prints.
pub fn render_job_list(
    out: &mut impl Write,
    reports: &[JobReport],
    now: DateTime<Utc>,
) -> Result<()> {
    for report in reports {
        writeln!(out, "=== JOB {}", "=".repeat(70))?;
        writeln!(out, "Name:          {}", report.name)?;
        writeln!(out, "Schedule:      {}", report.schedule)?;
        if !report.depends_on.is_empty() {
            writeln!(out, "Depends on:    {}", report.depends_on.join(", "))?;
        }
        match &report.record {
            None => {
                writeln!(out, "Status:        never run")?;
            }
            Some(record) => {
                writeln!(
                    out,
                    "First run:     {} ({})",
                    record.first_run,
                    relative(now, record.first_run)
                )?;
                writeln!(
                    out,
                    "Last run:      {} ({})",
                    record.last_run,
                    relative(now, record.last_run)
                )?;
                match record.last_success {
                    Some(instant) => writeln!(
                        out,
                        "Last success:  {} ({})",
                        instant,
                        relative(now, instant)
                    )?,
                    None => writeln!(out, "Last success:  never")?,
                }
                writeln!(
                    out,
                    "Next run:      {} ({})",
                    record.next_run,
                    relative(now, record.next_run)
                )?;
                if let Some(error) = &record.last_error {
                    writeln!(out, "Error count:   {}", record.error_count)?;
                    writeln!(out, "Last error:    {error}")?;
                }
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// One configuration problem found by `configtest`.
#[derive(Debug, Clone)]
pub struct ConfigProblem {
    /// The configured entry that caused the problem.
    pub entry: String,
    /// Error kind, e.g. "FrequencyDefinitionError".
    pub kind: &'static str,
    pub message: String,
}

/// The result of a configuration dry run.
#[derive(Debug, Clone, Default)]
pub struct ConfigReport {
    pub problems: Vec<ConfigProblem>,
}

impl ConfigReport {
    pub fn ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Dry-run the configured job entries: registry build and schedule
/// validation, per entry, collecting every problem. Executes nothing,
/// touches no state, and never fails.
pub fn configtest<I, S>(entries: I, handlers: &JobHandlers) -> ConfigReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = ConfigReport::default();
    for entry in entries {
        let entry = entry.as_ref();
        // Entries are checked one at a time so a bad one does not mask
        // problems in the entries after it.
        if let Err(err) = JobRegistry::build([entry], handlers) {
            report.problems.push(ConfigProblem {
                entry: entry.trim().to_string(),
                kind: err.kind(),
                message: err.to_string(),
            });
        }
    }
    report
}

/// Human-readable distance between `now` and `instant`, e.g. "in 2 hours"
/// or "3 days ago".
fn relative(now: DateTime<Utc>, instant: DateTime<Utc>) -> String {
    let delta = instant - now;
    let (magnitude, suffix) = if delta >= Duration::zero() {
        (delta, false)
    } else {
        (-delta, true)
    };

    let phrase = if magnitude < Duration::minutes(1) {
        "moments".to_string()
    } else if magnitude < Duration::hours(1) {
        plural(magnitude.num_minutes(), "minute")
    } else if magnitude < Duration::days(1) {
        plural(magnitude.num_hours(), "hour")
    } else {
        plural(magnitude.num_days(), "day")
    };

    if suffix {
        format!("{phrase} ago")
    } else {
        format!("in {phrase}")
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{Job, JobContext, JobError, JobResult};
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct Stub(&'static str);

    #[async_trait]
    impl Job for Stub {
        fn name(&self) -> &'static str {
            self.0
        }
        async fn execute(&self, _ctx: &JobContext) -> JobResult {
            Ok(())
        }
    }

    fn handlers() -> JobHandlers {
        let mut handlers = JobHandlers::new();
        handlers.register(Stub("fetch-adi"));
        handlers.register(Stub("matview-refresh"));
        handlers
    }

    #[tokio::test]
    async fn test_list_jobs_reports_never_run() {
        let registry = JobRegistry::build(["fetch-adi|1d|03:00"], &handlers()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path().join("state.json"), None)
            .await
            .unwrap();

        let reports = list_jobs(&registry, &store);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].schedule, "1d @ 03:00");
        assert!(reports[0].record.is_none());

        let mut rendered = Vec::new();
        render_job_list(&mut rendered, &reports, Utc::now()).unwrap();
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.contains("never run"));
    }

    #[tokio::test]
    async fn test_render_includes_error_detail() {
        let registry = JobRegistry::build(["fetch-adi|1d"], &handlers()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::load(dir.path().join("state.json"), None)
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap();
        store.set(
            "fetch-adi",
            RunRecord {
                first_run: now - Duration::days(3),
                last_run: now - Duration::hours(2),
                last_success: Some(now - Duration::days(1)),
                next_run: now + Duration::hours(22),
                last_error: Some(JobError::new("DatabaseError", "connection refused")),
                error_count: 2,
                depends_on: Vec::new(),
            },
        );

        let mut rendered = Vec::new();
        render_job_list(&mut rendered, &list_jobs(&registry, &store), now).unwrap();
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.contains("Error count:   2"));
        assert!(text.contains("DatabaseError: connection refused"));
        assert!(text.contains("2 hours ago"));
        assert!(text.contains("in 22 hours"));
    }

    #[test]
    fn test_configtest_collects_every_problem() {
        let report = configtest(
            [
                "fetch-adi|1d",
                "fetch-adi|1x",
                "no-such-job|1d",
                "matview-refresh|3h|10:00",
                "matview-refresh|1d|25:00",
            ],
            &handlers(),
        );
        assert!(!report.ok());
        let kinds: Vec<_> = report.problems.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            [
                "FrequencyFormatError",
                "JobNotFoundError",
                "FrequencyDefinitionError",
                "TimeFormatError",
            ]
        );
    }

    #[test]
    fn test_configtest_clean_config() {
        let report = configtest(
            ["fetch-adi|1d|03:00", "# comment", "matview-refresh|12h"],
            &handlers(),
        );
        assert!(report.ok());
        assert!(report.problems.is_empty());
    }

    #[test]
    fn test_relative_phrasing() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap();
        assert_eq!(relative(now, now + Duration::days(7)), "in 7 days");
        assert_eq!(relative(now, now - Duration::minutes(1)), "1 minute ago");
        assert_eq!(relative(now, now + Duration::seconds(5)), "in moments");
    }
}
