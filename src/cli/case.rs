//! Case command implementations

use log::debug;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, QueryArgs};
use crate::error::Result;
use crate::models::EntityKind;
use crate::output::{self, Paged};

/// Run the cases command
pub async fn cases(opts: &GlobalOptions, query: &QueryArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let request = query.to_request();

    let result = ctx.explorer()?.query_cases(&request, ctx.refresh).await?;
    output::print(&Paged::new(&result, request.start), ctx.format)
}

/// Run the entity command
pub async fn entity(
    opts: &GlobalOptions,
    case_id: i64,
    kind: EntityKind,
    query: &QueryArgs,
) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let request = query.to_request();

    let result = ctx
        .explorer()?
        .query_entity(case_id, kind, &request, ctx.refresh)
        .await?;
    output::print(&Paged::new(&result, request.start), ctx.format)
}

/// Run the case command
pub async fn case(opts: &GlobalOptions, case_id: i64) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    let data = ctx.explorer()?.case_data(case_id, ctx.refresh).await?;
    debug!("Fetched {} entities of case {}", data.0.len(), case_id);
    output::print(&data, ctx.format)
}

/// Run the correlate command
pub async fn correlate(opts: &GlobalOptions, case_id: i64, query: &QueryArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let request = query.to_request();

    let result = ctx
        .explorer()?
        .correlate(case_id, &request, ctx.refresh)
        .await?;
    output::print(&Paged::new(&result, request.start), ctx.format)
}
