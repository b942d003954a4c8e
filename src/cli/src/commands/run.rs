//! `run-all` and `run-one`: execute due jobs.
//!
//! Job-body failures are recorded in the run history, reported on the
//! terminal, and never turn into a non-zero exit code; only configuration
//! errors and state-store problems do.

use anyhow::Result;
use clap::Args;

use crashtab_core::config::Config;
use crashtab_core::orchestrator::JobOutcome;

use crate::output;

#[derive(Args)]
pub struct RunOneArgs {
    /// Name of the job to run
    pub name: String,

    /// Run even if the job is not due, ignoring dependency gating
    #[arg(short, long)]
    pub force: bool,
}

pub async fn run_all(config: &Config) -> Result<()> {
    let mut orchestrator = super::build_orchestrator(config).await?;
    let pass = orchestrator.run_all().await?;

    for entry in &pass {
        report_outcome(&entry.name, &entry.outcome);
    }
    let ran = pass.iter().filter(|entry| entry.outcome.ran()).count();
    output::print_info(&format!("{} of {} configured jobs ran", ran, pass.len()));
    Ok(())
}

pub async fn run_one(config: &Config, args: RunOneArgs) -> Result<()> {
    let mut orchestrator = super::build_orchestrator(config).await?;
    let outcome = orchestrator.run_one(&args.name, args.force).await?;
    report_outcome(&args.name, &outcome);
    Ok(())
}

fn report_outcome(name: &str, outcome: &JobOutcome) {
    match outcome {
        JobOutcome::RanSuccess => output::print_success(&format!("{name}: succeeded")),
        JobOutcome::RanFailure => {
            output::print_warning(&format!("{name}: failed (see run history)"))
        }
        JobOutcome::SkippedNotDue => output::print_info(&format!("{name}: not due")),
        JobOutcome::SkippedDependencyUnmet { dependency, reason } => output::print_info(&format!(
            "{name}: skipped, dependency {dependency} {reason}"
        )),
    }
}
