//! `list-jobs`: show every configured job and its run history.

use anyhow::Result;
use chrono::Utc;

use crashtab_core::config::Config;
use crashtab_core::introspect::{list_jobs, render_job_list};
use crashtab_core::registry::JobRegistry;
use crashtab_core::state::StateStore;

pub async fn execute(config: &Config) -> Result<()> {
    let handlers = super::platform_handlers();
    let registry = JobRegistry::build(&config.jobs, &handlers)?;
    let store = StateStore::load(config.state_file.as_str(), None).await?;

    let reports = list_jobs(&registry, &store);
    render_job_list(&mut std::io::stdout(), &reports, Utc::now())?;
    Ok(())
}
