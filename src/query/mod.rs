//! Server-side query protocol shared by both query engines
//!
//! A request carries an opaque `draw` token that is echoed back, a paging
//! window, a global search term, per-column filters and a single sort key.
//! Both the in-memory engine and the telemetry SQL engine answer with the
//! same envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::Record;

pub mod memory;

pub use memory::query_records;

/// Largest page a single request may ask for
pub const MAX_PAGE_LENGTH: i64 = 500;

/// Page length used when a request does not specify one
pub const DEFAULT_PAGE_LENGTH: i64 = 25;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    /// Parse a direction; anything other than `asc` means descending.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("asc") {
            SortDir::Asc
        } else {
            SortDir::Desc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

impl<'de> Deserialize<'de> for SortDir {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(SortDir::parse_lenient).unwrap_or_default())
    }
}

/// One page request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Opaque token echoed in the result
    #[serde(default)]
    pub draw: Value,

    /// Offset of the first row; negative values clamp to zero
    #[serde(default)]
    pub start: i64,

    /// Rows per page; clamped to `1..=500`
    #[serde(default = "default_length")]
    pub length: i64,

    /// Case-insensitive substring matched against any field
    #[serde(default, rename = "search")]
    pub global_search: String,

    /// Case-insensitive substring per column, ANDed together
    #[serde(default, rename = "filters")]
    pub column_filters: BTreeMap<String, String>,

    /// Column to sort by
    #[serde(default, rename = "order_column")]
    pub sort_column: Option<String>,

    #[serde(default, rename = "order_dir")]
    pub sort_dir: SortDir,
}

fn default_length() -> i64 {
    DEFAULT_PAGE_LENGTH
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            draw: Value::Null,
            start: 0,
            length: DEFAULT_PAGE_LENGTH,
            global_search: String::new(),
            column_filters: BTreeMap::new(),
            sort_column: None,
            sort_dir: SortDir::default(),
        }
    }
}

impl QueryRequest {
    /// Effective `(offset, limit)` after clamping
    pub fn window(&self) -> (usize, usize) {
        let offset = self.start.max(0) as usize;
        let limit = self.length.clamp(1, MAX_PAGE_LENGTH) as usize;
        (offset, limit)
    }

    /// Global search term, if one was given
    pub fn search_term(&self) -> Option<&str> {
        Some(self.global_search.as_str()).filter(|s| !s.is_empty())
    }

    /// Column filters with a non-empty value
    pub fn active_filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.column_filters
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One page of results.
///
/// `records_filtered <= records_total`, and `data` never holds more than the
/// requested length or `records_filtered` rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub draw: Value,
    pub records_total: u64,
    pub records_filtered: u64,
    pub data: Vec<Record>,
}

impl QueryResult {
    /// Envelope for a query that matched nothing
    pub fn empty(draw: Value) -> Self {
        Self {
            draw,
            records_total: 0,
            records_filtered: 0,
            data: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_window_clamps() {
        let req = QueryRequest {
            start: -5,
            length: 0,
            ..QueryRequest::default()
        };
        assert_eq!(req.window(), (0, 1));

        let req = QueryRequest {
            start: 30,
            length: 10_000,
            ..QueryRequest::default()
        };
        assert_eq!(req.window(), (30, 500));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let req: QueryRequest = serde_json::from_value(json!({
            "draw": 3,
            "search": "evil",
            "filters": {"ip": "10.", "tag": ""},
            "order_column": "ip",
            "order_dir": "ASC"
        }))
        .unwrap();

        assert_eq!(req.draw, json!(3));
        assert_eq!(req.length, DEFAULT_PAGE_LENGTH);
        assert_eq!(req.search_term(), Some("evil"));
        assert_eq!(req.active_filters().collect::<Vec<_>>(), vec![("ip", "10.")]);
        assert_eq!(req.sort_dir, SortDir::Asc);
    }

    #[test]
    fn test_unknown_direction_is_descending() {
        let req: QueryRequest =
            serde_json::from_value(json!({"order_dir": "sideways"})).unwrap();
        assert_eq!(req.sort_dir, SortDir::Desc);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = QueryResult::empty(json!("d1"));
        let text = serde_json::to_string(&result).unwrap();
        assert!(text.contains("\"recordsTotal\":0"));
        assert!(text.contains("\"recordsFiltered\":0"));
        assert!(text.contains("\"draw\":\"d1\""));
    }
}
