//! casescope - explore incident cases and correlate them with scan telemetry

use clap::Parser;

mod cache;
mod cli;
mod client;
mod config;
mod correlate;
mod db;
mod error;
mod explorer;
mod models;
mod output;
mod query;
mod source;
mod telemetry;

use cli::args::GlobalOptions;
use cli::{Cli, Commands, TelemetryCommands};
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or crate debug output with `--debug`.
fn init_logging(debug: bool) {
    let default_filter = if debug { "warn,casescope=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Cases { query } => cli::case::cases(&opts, &query).await,
        Commands::Entity {
            case_id,
            kind,
            query,
        } => cli::case::entity(&opts, case_id, kind, &query).await,
        Commands::Case { case_id } => cli::case::case(&opts, case_id).await,
        Commands::Correlate { case_id, query } => {
            cli::case::correlate(&opts, case_id, &query).await
        }
        Commands::Telemetry(cmd) => match cmd {
            TelemetryCommands::Browse { filters, query } => {
                cli::telemetry::browse(&opts, &filters, &query).await
            }
            TelemetryCommands::ReportTypes => cli::telemetry::report_types(&opts).await,
            TelemetryCommands::Stats => cli::telemetry::stats(&opts).await,
        },
        Commands::Batch { concurrency } => cli::batch::run(&opts, concurrency).await,
    }
}
