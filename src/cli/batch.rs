//! Batch mode: newline-delimited JSON operations over one shared cache
//!
//! Lines are executed concurrently (bounded) and answered in input order.
//! A line that fails to parse or execute produces an error response; it
//! never stops the batch.

use std::pin::pin;

use futures::StreamExt;
use futures::stream;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::error::{Error, ErrorKind, Result};
use crate::models::EntityKind;
use crate::output::json::format_json_line;
use crate::query::QueryRequest;
use crate::telemetry::{BrowseFilters, Predicate};

/// One batch operation, tagged by `op`
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Cases {
        #[serde(flatten)]
        query: QueryRequest,
    },
    Entity {
        case_id: i64,
        entity: EntityKind,
        #[serde(flatten)]
        query: QueryRequest,
    },
    Case {
        case_id: i64,
    },
    Correlate {
        case_id: i64,
        #[serde(flatten)]
        query: QueryRequest,
    },
    Telemetry {
        #[serde(flatten)]
        filters: BrowseFilters,
        #[serde(flatten)]
        query: QueryRequest,
    },
    ReportTypes,
    TelemetryStats,
    Invalidate {
        case_id: i64,
        #[serde(default)]
        entity: Option<EntityKind>,
    },
}

/// An operation plus the per-request options every operation accepts
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// Bypass cached entities for this request
    #[serde(default)]
    pub refresh: bool,

    /// Act as this credential instead of the configured one
    #[serde(default)]
    pub credential: Option<String>,

    #[serde(flatten)]
    pub op: Operation,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
    message: String,
}

/// One output line
#[derive(Debug, Serialize)]
struct BatchResponse {
    line: usize,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

impl BatchResponse {
    fn ok(line: usize, data: Value) -> Self {
        Self {
            line,
            status: "ok",
            data: Some(data),
            error: None,
        }
    }

    fn invalid(line: usize, message: String) -> Self {
        Self {
            line,
            status: "error",
            data: None,
            error: Some(ErrorBody {
                kind: "invalid_request",
                upstream_status: None,
                message,
            }),
        }
    }

    fn failed(line: usize, err: &Error) -> Self {
        let kind = err.kind();
        let upstream_status = match kind {
            ErrorKind::Upstream { status } => status,
            _ => None,
        };
        Self {
            line,
            status: "error",
            data: None,
            error: Some(ErrorBody {
                kind: kind.label(),
                upstream_status,
                message: err.to_string(),
            }),
        }
    }
}

async fn dispatch(ctx: &CommandContext, request: BatchRequest) -> Result<Value> {
    let bypass = request.refresh || ctx.refresh;
    let credential = request.credential.as_deref();

    let data = match request.op {
        Operation::Cases { query } => {
            serde_json::to_value(ctx.explorer_for(credential)?.query_cases(&query, bypass).await?)?
        }
        Operation::Entity {
            case_id,
            entity,
            query,
        } => serde_json::to_value(
            ctx.explorer_for(credential)?
                .query_entity(case_id, entity, &query, bypass)
                .await?,
        )?,
        Operation::Case { case_id } => {
            serde_json::to_value(ctx.explorer_for(credential)?.case_data(case_id, bypass).await?)?
        }
        Operation::Correlate { case_id, query } => serde_json::to_value(
            ctx.explorer_for(credential)?
                .correlate(case_id, &query, bypass)
                .await?,
        )?,
        Operation::Telemetry { filters, query } => serde_json::to_value(
            ctx.require_telemetry()?
                .query(&query, &Predicate::Browse(filters))
                .await?,
        )?,
        Operation::ReportTypes => serde_json::to_value(ctx.require_telemetry()?.report_types().await?)?,
        Operation::TelemetryStats => serde_json::to_value(ctx.require_telemetry()?.stats().await?)?,
        Operation::Invalidate { case_id, entity } => {
            let removed = ctx.explorer_for(credential)?.invalidate(case_id, entity);
            json!({ "removed": removed })
        }
    };
    Ok(data)
}

async fn execute(ctx: &CommandContext, line_no: usize, line: &str) -> BatchResponse {
    let request: BatchRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return BatchResponse::invalid(line_no, e.to_string()),
    };
    debug!("Batch line {}: {:?}", line_no, request.op);

    match dispatch(ctx, request).await {
        Ok(data) => BatchResponse::ok(line_no, data),
        Err(err) => BatchResponse::failed(line_no, &err),
    }
}

/// Answer one raw input line; blank lines get no response
async fn answer_line(ctx: &CommandContext, line_no: usize, bytes: Vec<u8>) -> Option<BatchResponse> {
    let line = match String::from_utf8(bytes) {
        Ok(line) => line,
        Err(e) => return Some(BatchResponse::invalid(line_no, format!("line is not valid UTF-8: {}", e))),
    };
    if line.trim().is_empty() {
        return None;
    }
    Some(execute(ctx, line_no, &line).await)
}

/// Strip the line terminator left by `read_until`
fn trim_newline(mut buf: Vec<u8>) -> Vec<u8> {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    buf
}

/// Run the batch command
pub async fn run(opts: &GlobalOptions, concurrency: usize) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let reader = BufReader::new(tokio::io::stdin());

    let input = stream::unfold(reader, |mut reader| async move {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => None,
            Ok(_) => Some((Ok(trim_newline(buf)), reader)),
            Err(e) => Some((Err(e), reader)),
        }
    });

    let ctx = &ctx;
    let mut responses = pin!(
        input
            .enumerate()
            .map(|(i, line)| async move { Ok::<_, Error>(answer_line(ctx, i + 1, line?).await) })
            .buffered(concurrency.max(1))
    );

    let mut answered = 0usize;
    while let Some(response) = responses.next().await {
        if let Some(response) = response? {
            println!("{}", format_json_line(&response)?);
            answered += 1;
        }
    }

    let stats = ctx.cache_stats();
    debug!(
        "Batch answered {} lines; cache holds {} entries ({} expired, capacity {})",
        answered, stats.entries, stats.expired_entries, stats.capacity
    );
    Ok(())
}
