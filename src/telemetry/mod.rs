//! SQL query engine over the ingested telemetry table (`ss_events`)
//!
//! Supports free-form browsing (report type and date range) and indicator
//! correlation against a case's [`IndicatorSet`]. Paging happens in the
//! database; both counts come from their own COUNT queries.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use log::{debug, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::correlate::IndicatorSet;
use crate::db::{open_read_only, parse_json_text, row_to_record, run_blocking};
use crate::error::Result;
use crate::models::Record;
use crate::query::{QueryRequest, QueryResult};

pub mod builder;
pub mod columns;

pub use builder::Conditions;
pub use columns::{SEARCH_COLUMNS, SELECT_COLUMNS, SortSpec, TelemetryColumn};

const EVENTS_TABLE: &str = "ss_events";
const INGESTION_LOG_TABLE: &str = "ss_ingestion_log";
const RECENT_RUNS: i64 = 10;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Browse-mode narrowing; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseFilters {
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
}

/// What a telemetry query is scoped to
#[derive(Debug, Clone)]
pub enum Predicate {
    /// The whole table, narrowed by the given filters
    Browse(BrowseFilters),
    /// Rows whose ip, hostname or asn is one of the indicators
    Indicators(IndicatorSet),
}

impl Predicate {
    /// Conditions defining `recordsTotal`
    fn base(&self) -> Conditions {
        let mut cond = Conditions::new();
        if let Predicate::Indicators(set) = self {
            cond.push_any_in(vec![
                ("ip", ip_params(&set.ips)),
                (
                    "LOWER(hostname)",
                    set.hostnames.iter().cloned().map(SqlValue::Text).collect(),
                ),
                ("asn", set.asns.iter().copied().map(SqlValue::Integer).collect()),
            ]);
        }
        cond
    }

    /// Predicate conditions that only narrow `recordsFiltered`.
    ///
    /// Date bounds compare the calendar day, so timestamps in `report_date`
    /// fall on the day they are displayed as.
    fn narrowing(&self) -> Conditions {
        let mut cond = Conditions::new();
        if let Predicate::Browse(filters) = self {
            if let Some(report_type) = filters.report_type.as_deref().filter(|t| !t.is_empty()) {
                cond.push_eq("report_type", report_type.to_string());
            }
            if let Some(from) = filters.date_from {
                cond.push("date(report_date) >= ?", [SqlValue::Text(from.format(DATE_FORMAT).to_string())]);
            }
            if let Some(to) = filters.date_to {
                cond.push("date(report_date) <= ?", [SqlValue::Text(to.format(DATE_FORMAT).to_string())]);
            }
        }
        cond
    }
}

/// Each IP as text, plus the integer form of every IPv4 address so rows
/// storing addresses as integers match too.
fn ip_params(ips: &BTreeSet<String>) -> Vec<SqlValue> {
    let mut params = Vec::with_capacity(ips.len() * 2);
    for ip in ips {
        params.push(SqlValue::Text(ip.clone()));
        if let Ok(addr) = ip.parse::<Ipv4Addr>() {
            params.push(SqlValue::Integer(i64::from(u32::from(addr))));
        }
    }
    params
}

/// Fully resolved statements for one request
#[derive(Debug, Clone)]
struct QueryPlan {
    base: Conditions,
    filtered: Conditions,
    sort: SortSpec,
    offset: usize,
    limit: usize,
}

impl QueryPlan {
    fn build(request: &QueryRequest, predicate: &Predicate) -> Self {
        let base = predicate.base();

        let mut narrowing = predicate.narrowing();
        if let Some(term) = request.search_term() {
            narrowing.push_contains_any(&SEARCH_COLUMNS, term);
        }
        for (name, value) in request.active_filters() {
            match TelemetryColumn::from_name(name) {
                Some(column) => narrowing.push_contains(column.match_expr(), value),
                None => warn!("Ignoring filter on unknown column {:?}", name),
            }
        }

        let (offset, limit) = request.window();
        Self {
            filtered: base.clone().and(&narrowing),
            base,
            sort: SortSpec::resolve(request.sort_column.as_deref(), request.sort_dir),
            offset,
            limit,
        }
    }

    fn execute(&self, conn: &Connection, draw: Value) -> Result<QueryResult> {
        let records_total = count(conn, &self.base)?;
        let records_filtered = count(conn, &self.filtered)?;

        let column = self.sort.column.sql_name();
        let dir = self.sort.dir.as_sql();
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} {} NULLS LAST, id {} LIMIT ? OFFSET ?",
            SELECT_COLUMNS,
            EVENTS_TABLE,
            self.filtered.where_sql(),
            column,
            dir,
            dir
        );

        let mut params = self.filtered.params().to_vec();
        params.push(SqlValue::Integer(self.limit as i64));
        params.push(SqlValue::Integer(self.offset as i64));
        debug!("Telemetry page query with {} parameters", params.len());

        let mut stmt = conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let data = stmt
            .query_map(params_from_iter(params.iter()), |row| row_to_record(row, &names))?
            .map(|row| row.map(serialize_event))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(QueryResult {
            draw,
            records_total,
            records_filtered,
            data,
        })
    }
}

fn count(conn: &Connection, cond: &Conditions) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}{}", EVENTS_TABLE, cond.where_sql());
    debug!("Telemetry count query with {} parameters", cond.params().len());
    let n: i64 = conn.query_row(&sql, params_from_iter(cond.params().iter()), |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

/// Convert one raw row into its presentable form
fn serialize_event(mut record: Record) -> Record {
    if let Some(value) = record.get_mut("report_date") {
        *value = normalize_date(value.take());
    }
    if let Some(value) = record.get_mut("ingested_at") {
        *value = normalize_timestamp(value.take());
    }
    if let Some(value) = record.get_mut("ip") {
        *value = normalize_ip(value.take());
    }
    if let Some(value) = record.get_mut("raw_data") {
        *value = parse_json_text(value.take());
    }
    record
}

fn normalize_date(value: Value) -> Value {
    let Value::String(s) = &value else {
        return value;
    };
    let date = NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| parse_naive_datetime(s).map(|dt| dt.date()));
    match date {
        Some(d) => Value::String(d.format(DATE_FORMAT).to_string()),
        None => value,
    }
}

fn normalize_timestamp(value: Value) -> Value {
    let parsed = match &value {
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => s
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| parse_naive_datetime(s).map(|dt| dt.and_utc())),
        _ => None,
    };
    match parsed {
        Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => value,
    }
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Addresses stored as integers are rendered dotted-quad
fn normalize_ip(value: Value) -> Value {
    let as_int = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => s.parse().ok(),
        _ => None,
    };
    match as_int.and_then(|i| u32::try_from(i).ok()) {
        Some(addr) => Value::String(Ipv4Addr::from(addr).to_string()),
        None => value,
    }
}

/// Summary of the telemetry store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryStats {
    pub total_events: u64,
    pub report_types: u64,
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,
    pub recent_runs: Vec<Record>,
}

/// Read-only handle on a telemetry database file
#[derive(Debug, Clone)]
pub struct TelemetryDb {
    path: PathBuf,
}

impl TelemetryDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Answer one page request scoped by `predicate`.
    ///
    /// An indicator predicate with no indicators matches nothing and is
    /// answered without touching the database.
    pub async fn query(&self, request: &QueryRequest, predicate: &Predicate) -> Result<QueryResult> {
        if let Predicate::Indicators(set) = predicate
            && set.is_empty()
        {
            debug!("No indicators to correlate, skipping telemetry query");
            return Ok(QueryResult::empty(request.draw.clone()));
        }

        let plan = QueryPlan::build(request, predicate);
        let draw = request.draw.clone();
        let path = self.path.clone();
        run_blocking(move || {
            let conn = open_read_only(&path)?;
            plan.execute(&conn, draw)
        })
        .await
    }

    /// Distinct report types, sorted
    pub async fn report_types(&self) -> Result<Vec<String>> {
        let path = self.path.clone();
        run_blocking(move || {
            let conn = open_read_only(&path)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT DISTINCT report_type FROM {} ORDER BY report_type",
                EVENTS_TABLE
            ))?;
            let types = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(types)
        })
        .await
    }

    /// Event totals, date span and the most recent ingestion runs
    pub async fn stats(&self) -> Result<TelemetryStats> {
        let path = self.path.clone();
        run_blocking(move || {
            let conn = open_read_only(&path)?;
            let (total_events, report_types, earliest_date, latest_date) = conn.query_row(
                &format!(
                    "SELECT COUNT(*), COUNT(DISTINCT report_type), MIN(report_date), MAX(report_date) FROM {}",
                    EVENTS_TABLE
                ),
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )?;

            Ok(TelemetryStats {
                total_events: total_events.max(0) as u64,
                report_types: report_types.max(0) as u64,
                earliest_date,
                latest_date,
                recent_runs: recent_runs(&conn)?,
            })
        })
        .await
    }
}

/// Last ingestion runs, newest first; empty when the log table is absent
fn recent_runs(conn: &Connection) -> Result<Vec<Record>> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [INGESTION_LOG_TABLE],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT run_started, run_finished, status, reports_found, events_ingested, \
         events_skipped, error_message FROM {} ORDER BY id DESC LIMIT ?",
        INGESTION_LOG_TABLE
    ))?;
    let names: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let runs = stmt
        .query_map([RECENT_RUNS], |row| row_to_record(row, &names))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(runs)
}
