//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DataSource;
use crate::models::EntityKind;

pub mod args;
pub mod batch;
pub mod case;
pub mod context;
pub mod telemetry;

pub use args::{BrowseArgs, OutputFormat, QueryArgs};
pub use context::CommandContext;

/// casescope - explore incident cases and correlate them with scan telemetry
#[derive(Parser, Debug)]
#[command(name = "casescope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "CASESCOPE_FORMAT",
        default_value = "table",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "CASESCOPE_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "CASESCOPE_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Bypass cached entities, fetch fresh data
    #[arg(long, global = true, env = "CASESCOPE_REFRESH", hide_env = true)]
    pub refresh: bool,

    /// Case data backend (api, db)
    #[arg(
        long,
        global = true,
        value_enum,
        env = "CASESCOPE_SOURCE",
        hide_env = true,
        hide_possible_values = true
    )]
    pub source: Option<DataSource>,

    /// API key for the case management platform
    #[arg(
        long,
        global = true,
        env = "CASESCOPE_API_KEY",
        hide_env = true,
        hide_env_values = true
    )]
    pub api_key: Option<String>,

    /// Base URL of the case management platform
    #[arg(long, global = true, env = "CASESCOPE_IRIS_URL", hide_env = true)]
    pub iris_url: Option<String>,

    /// SQLite file holding the case tables (db source)
    #[arg(long, global = true, env = "CASESCOPE_CASE_DB", hide_env = true)]
    pub case_db: Option<PathBuf>,

    /// SQLite file holding the telemetry table
    #[arg(long, global = true, env = "CASESCOPE_TELEMETRY_DB", hide_env = true)]
    pub telemetry_db: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List cases
    Cases {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Page through one entity of a case
    Entity {
        /// Case ID
        case_id: i64,

        /// Entity to read (case, assets, iocs, events, tasks, notes, evidences)
        #[arg(value_enum, hide_possible_values = true)]
        kind: EntityKind,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Fetch every entity of a case
    Case {
        /// Case ID
        case_id: i64,
    },

    /// Telemetry rows matching a case's IPs, hostnames and ASNs
    Correlate {
        /// Case ID
        case_id: i64,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Explore the telemetry database
    #[command(subcommand)]
    Telemetry(TelemetryCommands),

    /// Run newline-delimited JSON operations read from stdin
    #[command(after_help = "\
Each input line is one operation, for example:
  {\"op\": \"entity\", \"case_id\": 42, \"entity\": \"iocs\", \"search\": \"evil\"}
  {\"op\": \"correlate\", \"case_id\": 42, \"refresh\": true}
  {\"op\": \"invalidate\", \"case_id\": 42, \"entity\": \"assets\"}

One JSON response line is written per input line, in input order.")]
    Batch {
        /// Operations executed at once
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
    },
}

/// Telemetry subcommands
#[derive(Subcommand, Debug)]
pub enum TelemetryCommands {
    /// Page through telemetry events
    Browse {
        #[command(flatten)]
        filters: BrowseArgs,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// List distinct report types
    ReportTypes,

    /// Show event counts, date range and recent ingestion runs
    Stats,
}
