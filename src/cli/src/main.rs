//! Crashtab CLI - command-line front end for the crash-platform job
//! scheduler.
//!
//! Invoked by an external periodic trigger (typically a system timer) for
//! `run-all`, and by operators for the other commands.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crashtab_core::config::Config;

/// Crashtab - periodic maintenance/ETL job scheduler
#[derive(Parser)]
#[command(
    name = "crashtab",
    version = "0.1.0",
    about = "Crashtab - crash-platform job scheduler",
    long_about = "Runs the crash platform's periodic maintenance and ETL jobs: \
                  evaluates which configured jobs are due, executes them in \
                  order, and records their run history.",
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file (TOML); environment variables override it
    #[arg(short, long, global = true, env = "CRASHTAB_CONFIG")]
    config: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pass over every configured job
    RunAll,

    /// Run a single job by name
    RunOne(commands::run::RunOneArgs),

    /// List configured jobs and their run history
    ListJobs,

    /// Check the job configuration without running anything
    Configtest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    dotenvy::dotenv().ok();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level)),
        )
        .init();

    let result = match cli.command {
        Commands::RunAll => commands::run::run_all(&config).await,
        Commands::RunOne(args) => commands::run::run_one(&config, args).await,
        Commands::ListJobs => commands::list::execute(&config).await,
        Commands::Configtest => commands::configtest::execute(&config),
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
