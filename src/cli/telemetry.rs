//! Telemetry command implementations

use crate::cli::args::GlobalOptions;
use crate::cli::{BrowseArgs, CommandContext, QueryArgs};
use crate::error::Result;
use crate::output::{self, Paged};
use crate::telemetry::Predicate;

/// Run the telemetry browse command
pub async fn browse(opts: &GlobalOptions, filters: &BrowseArgs, query: &QueryArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let request = query.to_request();

    let result = ctx
        .require_telemetry()?
        .query(&request, &Predicate::Browse(filters.to_filters()))
        .await?;
    output::print(&Paged::new(&result, request.start), ctx.format)
}

/// Run the telemetry report-types command
pub async fn report_types(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let types = ctx.require_telemetry()?.report_types().await?;
    output::print(&types, ctx.format)
}

/// Run the telemetry stats command
pub async fn stats(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let stats = ctx.require_telemetry()?.stats().await?;
    output::print(&stats, ctx.format)
}
