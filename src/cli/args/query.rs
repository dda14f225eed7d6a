//! Query argument types for paged commands

use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;

use crate::query::{DEFAULT_PAGE_LENGTH, QueryRequest, SortDir};
use crate::telemetry::BrowseFilters;

/// Paging, search, filter and sort arguments.
///
/// Flatten this into any command that answers with a result page:
/// ```ignore
/// Cases {
///     #[command(flatten)]
///     query: QueryArgs,
/// }
/// ```
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Offset of the first row
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub start: i64,

    /// Rows per page (1-500)
    #[arg(long, short = 'n', default_value_t = DEFAULT_PAGE_LENGTH)]
    pub length: i64,

    /// Case-insensitive substring matched against every column
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Column filter as COL=VALUE (repeatable, ANDed)
    #[arg(long = "filter", short = 'f', value_name = "COL=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// Column to sort by
    #[arg(long, value_name = "COL")]
    pub sort: Option<String>,

    /// Sort direction (asc, desc)
    #[arg(long, value_enum, hide_possible_values = true)]
    pub dir: Option<SortDir>,

    /// Token echoed back in the result
    #[arg(long)]
    pub draw: Option<i64>,
}

fn parse_filter(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((col, value)) if !col.trim().is_empty() => {
            Ok((col.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected COL=VALUE, got '{}'", s)),
    }
}

impl QueryArgs {
    /// Convert CLI args into a query request.
    ///
    /// A repeated filter on the same column keeps the last value.
    pub fn to_request(&self) -> QueryRequest {
        QueryRequest {
            draw: self.draw.map(Value::from).unwrap_or(Value::Null),
            start: self.start,
            length: self.length,
            global_search: self.search.clone().unwrap_or_default(),
            column_filters: self.filters.iter().cloned().collect(),
            sort_column: self.sort.clone(),
            sort_dir: self.dir.unwrap_or_default(),
        }
    }
}

/// Telemetry browse narrowing
#[derive(Args, Debug, Clone, Default)]
pub struct BrowseArgs {
    /// Only rows of this report type
    #[arg(long)]
    pub report_type: Option<String>,

    /// Earliest report date, inclusive
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date_from: Option<NaiveDate>,

    /// Latest report date, inclusive
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date_to: Option<NaiveDate>,
}

impl BrowseArgs {
    pub fn to_filters(&self) -> BrowseFilters {
        BrowseFilters {
            report_type: self.report_type.clone().filter(|t| !t.is_empty()),
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        browse: BrowseArgs,
    }

    fn parse(args: &[&str]) -> Harness {
        Harness::parse_from(std::iter::once("test").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let req = parse(&[]).query.to_request();
        assert_eq!(req, QueryRequest::default());
    }

    #[test]
    fn test_full_request() {
        let h = parse(&[
            "--start", "50", "-n", "10", "--search", "evil", "-f", "geo=US", "--filter",
            "tag=a=b", "--sort", "ip", "--dir", "asc", "--draw", "4",
        ]);
        let req = h.query.to_request();

        assert_eq!(req.draw, json!(4));
        assert_eq!(req.window(), (50, 10));
        assert_eq!(req.search_term(), Some("evil"));
        assert_eq!(
            req.active_filters().collect::<Vec<_>>(),
            vec![("geo", "US"), ("tag", "a=b")]
        );
        assert_eq!(req.sort_column.as_deref(), Some("ip"));
        assert_eq!(req.sort_dir, SortDir::Asc);
    }

    #[test]
    fn test_malformed_filter_rejected() {
        let result = Harness::try_parse_from(["test", "--filter", "novalue"]);
        assert!(result.is_err());
        assert!(parse_filter("=x").is_err());
    }

    #[test]
    fn test_browse_filters() {
        let h = parse(&["--report-type", "scan_ssh", "--date-from", "2024-05-01"]);
        let filters = h.browse.to_filters();
        assert_eq!(filters.report_type.as_deref(), Some("scan_ssh"));
        assert_eq!(filters.date_from, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(filters.date_to, None);

        assert!(Harness::try_parse_from(["test", "--date-to", "May 1"]).is_err());
    }
}
