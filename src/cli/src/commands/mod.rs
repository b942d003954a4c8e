//! Command implementations and the shared wiring they build on.

pub mod configtest;
pub mod list;
pub mod run;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use crashtab_core::config::Config;
use crashtab_core::jobs::{
    CleanupOldCrashReportsJob, FetchAdiJob, JobEnv, MatviewRefreshJob, WeeklyReportsPartitionsJob,
};
use crashtab_core::mirror::{PostgresMirror, StateMirror};
use crashtab_core::orchestrator::Orchestrator;
use crashtab_core::registry::{JobHandlers, JobRegistry};
use crashtab_core::state::StateStore;

/// Handler table of the platform's built-in jobs.
///
/// Every job that may appear in the configured entries must be registered
/// here; `configtest` reports unknown references against this table.
pub fn platform_handlers() -> JobHandlers {
    let mut handlers = JobHandlers::new();
    handlers.register(FetchAdiJob::new());
    handlers.register(MatviewRefreshJob::new());
    handlers.register(CleanupOldCrashReportsJob::new());
    handlers.register(WeeklyReportsPartitionsJob::new());
    handlers
}

/// Wire up a ready-to-run orchestrator from the configuration: registry,
/// state store (with mirror, if configured) and the job environment.
pub async fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let handlers = platform_handlers();
    let registry = JobRegistry::build(&config.jobs, &handlers)?;

    let mirror: Option<Arc<dyn StateMirror>> = match &config.mirror {
        Some(mirror_config) => {
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .connect(&mirror_config.url)
                .await?;
            let mirror = PostgresMirror::new(pool);
            mirror.ensure_schema().await?;
            Some(Arc::new(mirror))
        }
        None => None,
    };
    let state = StateStore::load(config.state_file.as_str(), mirror).await?;

    let mut env = JobEnv::new();
    if let Some(database) = &config.database {
        let pool = PgPoolOptions::new()
            .max_connections(database.max_connections)
            .connect(&database.url)
            .await?;
        env = env.with_db(pool);
    }

    Ok(Orchestrator::new(registry, state, env))
}
