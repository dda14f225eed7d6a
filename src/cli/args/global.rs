//! Global CLI options shared across all commands

use std::path::PathBuf;

use crate::cli::{Cli, OutputFormat};
use crate::config::{Config, DataSource};

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// For every option the precedence is: CLI flag > environment variable > config file >
/// default. This struct captures the CLI/env layer; [`GlobalOptions::apply_to`] lays it
/// over the loaded config in `CommandContext`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output format (table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.casescope/config.yaml)
    pub config: Option<String>,

    /// Bypass cached entities and fetch fresh data
    pub refresh: bool,

    /// Case data backend override
    pub source: Option<DataSource>,

    /// API key override
    pub api_key: Option<String>,

    /// Case management base URL override
    pub iris_url: Option<String>,

    /// Case database override
    pub case_db: Option<PathBuf>,

    /// Telemetry database override
    pub telemetry_db: Option<PathBuf>,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            refresh: cli.refresh,
            source: cli.source,
            api_key: cli.api_key.clone(),
            iris_url: cli.iris_url.clone(),
            case_db: cli.case_db.clone(),
            telemetry_db: cli.telemetry_db.clone(),
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Overwrite config values with every option that was given.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(source) = self.source {
            config.data_source = source;
        }
        if let Some(ref key) = self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(ref url) = self.iris_url {
            config.iris_url = url.clone();
        }
        if let Some(ref path) = self.case_db {
            config.case_db = Some(path.clone());
        }
        if let Some(ref path) = self.telemetry_db {
            config.telemetry_db = Some(path.clone());
        }
        config.normalize();
    }
}
