//! `configtest`: dry-run the job configuration.
//!
//! Exits 0 when every entry parses and validates, 1 otherwise. Nothing is
//! executed and the state store is never touched.

use anyhow::{anyhow, Result};

use crashtab_core::config::Config;
use crashtab_core::introspect::configtest;

use crate::output;

pub fn execute(config: &Config) -> Result<()> {
    let handlers = super::platform_handlers();
    let report = configtest(&config.jobs, &handlers);

    if report.ok() {
        output::print_success(&format!(
            "configuration OK ({} entries)",
            config.jobs.len()
        ));
        return Ok(());
    }

    for problem in &report.problems {
        output::print_error(&format!(
            "{} in {:?}: {}",
            problem.kind, problem.entry, problem.message
        ));
    }
    Err(anyhow!(
        "{} configuration problem(s) found",
        report.problems.len()
    ))
}
