//! Shared SQLite plumbing for the case and telemetry stores
//!
//! Every query opens its own read-only connection on a blocking worker so a
//! slow query holds up only the request that issued it.

use std::path::Path;
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use serde_json::Value;

use crate::error::{DatabaseError, Result};
use crate::models::Record;

#[cfg(test)]
pub mod fixtures;

/// How long a reader waits on a writer's lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open `path` read-only
pub fn open_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| DatabaseError::Open {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Run blocking database work off the async executor
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

/// Convert one SQLite value to JSON
pub fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}

/// Convert a row into a record keyed by the statement's column names
pub fn row_to_record(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (idx, name) in columns.iter().enumerate() {
        record.insert(name.clone(), sql_to_json(row.get_ref(idx)?));
    }
    Ok(record)
}

/// Parse a text value holding serialized JSON back into structured form.
///
/// Values that are not text, or not valid JSON, are returned unchanged.
pub fn parse_json_text(value: Value) -> Value {
    if let Value::String(s) = &value {
        let trimmed = s.trim_start();
        if (trimmed.starts_with('{') || trimmed.starts_with('['))
            && let Ok(parsed) = serde_json::from_str::<Value>(s)
        {
            return parsed;
        }
    }
    value
}
