//! Built-in platform maintenance jobs.
//!
//! These run against the crash store through the database handle in
//! [`JobContext`]. Without a configured database they log what they would
//! have done and succeed, so a development deployment can exercise the
//! scheduler end to end.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Job, JobContext, JobResult};

/// Job: Fetch the daily active-installs counts from the metrics feed into
/// the crash store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchAdiJob {
    /// How many days back to (re)fetch on each run
    pub lookback_days: u32,
}

impl FetchAdiJob {
    pub fn new() -> Self {
        Self { lookback_days: 2 }
    }
}

impl Default for FetchAdiJob {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Job for FetchAdiJob {
    fn name(&self) -> &'static str {
        "fetch-adi"
    }

    async fn execute(&self, ctx: &JobContext) -> JobResult {
        ctx.log_info(&format!(
            "Fetching ADI counts for the last {} days",
            self.lookback_days
        ));
        let Some(pool) = ctx.db() else {
            ctx.log_warn("no database configured; skipping ADI import");
            return Ok(());
        };
        sqlx::query("SELECT import_raw_adi($1)")
            .bind(self.lookback_days as i32)
            .execute(pool)
            .await?;
        Ok(())
    }
}

/// Job: Refresh the reporting materialized views.
///
/// Gated on [`FetchAdiJob`] so the views never aggregate a day whose ADI
/// counts have not landed yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatviewRefreshJob {
    /// Stored procedures to invoke, in order
    pub procedures: Vec<String>,
}

impl MatviewRefreshJob {
    pub fn new() -> Self {
        Self {
            procedures: vec![
                "update_signatures".to_string(),
                "update_crashes_by_user".to_string(),
                "update_adu".to_string(),
            ],
        }
    }
}

impl Default for MatviewRefreshJob {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Job for MatviewRefreshJob {
    fn name(&self) -> &'static str {
        "matview-refresh"
    }

    fn depends_on(&self) -> Vec<&'static str> {
        vec!["fetch-adi"]
    }

    async fn execute(&self, ctx: &JobContext) -> JobResult {
        let Some(pool) = ctx.db() else {
            ctx.log_warn("no database configured; skipping matview refresh");
            return Ok(());
        };
        for procedure in &self.procedures {
            ctx.log_info(&format!("Refreshing via {procedure}()"));
            sqlx::query(&format!("SELECT {procedure}()"))
                .execute(pool)
                .await?;
        }
        Ok(())
    }
}

/// Job: Delete crash reports past the retention window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupOldCrashReportsJob {
    /// Maximum age of crash reports to keep (days)
    pub retention_days: u32,
}

impl CleanupOldCrashReportsJob {
    pub fn new() -> Self {
        Self {
            retention_days: 180,
        }
    }
}

impl Default for CleanupOldCrashReportsJob {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Job for CleanupOldCrashReportsJob {
    fn name(&self) -> &'static str {
        "purge-expired-crashes"
    }

    async fn execute(&self, ctx: &JobContext) -> JobResult {
        ctx.log_info(&format!(
            "Purging crash reports older than {} days",
            self.retention_days
        ));
        let Some(pool) = ctx.db() else {
            ctx.log_warn("no database configured; skipping purge");
            return Ok(());
        };
        let result = sqlx::query(
            "DELETE FROM crash_reports
             WHERE date_processed < now() - make_interval(days => $1)",
        )
        .bind(self.retention_days as i32)
        .execute(pool)
        .await?;
        ctx.log_info(&format!("Purged {} crash reports", result.rows_affected()));
        Ok(())
    }
}

/// Job: Create next week's report partitions ahead of time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReportsPartitionsJob {
    /// How many weeks of partitions to keep pre-created
    pub weeks_ahead: u32,
}

impl WeeklyReportsPartitionsJob {
    pub fn new() -> Self {
        Self { weeks_ahead: 2 }
    }
}

impl Default for WeeklyReportsPartitionsJob {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Job for WeeklyReportsPartitionsJob {
    fn name(&self) -> &'static str {
        "weekly-reports-partitions"
    }

    async fn execute(&self, ctx: &JobContext) -> JobResult {
        ctx.log_info(&format!(
            "Ensuring report partitions exist {} weeks ahead",
            self.weeks_ahead
        ));
        let Some(pool) = ctx.db() else {
            ctx.log_warn("no database configured; skipping partition creation");
            return Ok(());
        };
        sqlx::query("SELECT weekly_report_partitions($1)")
            .bind(self.weeks_ahead as i32)
            .execute(pool)
            .await?;
        Ok(())
    }
}
