//! Configuration management.

use serde::Deserialize;

/// Main scheduler configuration.
///
/// The hosting process loads this and explicitly constructs the state
/// store and orchestrator from it; nothing here is read through a global.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path of the primary state document
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Job entries, `impl_ref|frequency[|HH:MM]` each
    #[serde(default)]
    pub jobs: Vec<String>,

    /// Optional durable mirror for the state document
    #[serde(default)]
    pub mirror: Option<MirrorConfig>,

    /// Database configuration for jobs that need the crash store
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// PostgreSQL connection URL for the mirror table
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            jobs: Vec::new(),
            mirror: None,
            database: None,
            observability: ObservabilityConfig::default(),
        }
    }
}

// Default value functions
fn default_state_file() -> String {
    "crashtab-state.json".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("CRASHTAB").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("CRASHTAB").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}
