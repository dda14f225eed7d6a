//! Allow-list of telemetry columns that may appear in SQL text

use log::warn;

use crate::query::SortDir;

/// Columns returned by every page query, in output order
pub const SELECT_COLUMNS: &str = "id, report_type, report_date, ip, port, asn, geo, \
     hostname, tag, severity, raw_data, ingested_at";

/// `ip` as rows are displayed: an all-digit value in IPv4 range becomes its
/// dotted quad, anything else is left as stored.
pub const IP_DISPLAY_SQL: &str = "(CASE WHEN CAST(ip AS TEXT) <> '' \
     AND CAST(ip AS TEXT) NOT GLOB '*[^0-9]*' \
     AND CAST(ip AS INTEGER) BETWEEN 0 AND 4294967295 \
     THEN ((CAST(ip AS INTEGER) >> 24) & 255) || '.' || ((CAST(ip AS INTEGER) >> 16) & 255) \
     || '.' || ((CAST(ip AS INTEGER) >> 8) & 255) || '.' || (CAST(ip AS INTEGER) & 255) \
     ELSE ip END)";

/// Expressions matched by the global search term
pub const SEARCH_COLUMNS: [&str; 6] = [
    IP_DISPLAY_SQL,
    "hostname",
    "tag",
    "geo",
    "report_type",
    "raw_data",
];

/// Sortable and filterable telemetry columns.
///
/// Only names produced by [`TelemetryColumn::sql_name`] are ever formatted
/// into SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryColumn {
    ReportDate,
    ReportType,
    Ip,
    Port,
    Asn,
    Geo,
    Hostname,
    Tag,
    Severity,
    IngestedAt,
}

impl TelemetryColumn {
    pub const ALL: [TelemetryColumn; 10] = [
        TelemetryColumn::ReportDate,
        TelemetryColumn::ReportType,
        TelemetryColumn::Ip,
        TelemetryColumn::Port,
        TelemetryColumn::Asn,
        TelemetryColumn::Geo,
        TelemetryColumn::Hostname,
        TelemetryColumn::Tag,
        TelemetryColumn::Severity,
        TelemetryColumn::IngestedAt,
    ];

    /// Look up a user-supplied column name (exact match)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.sql_name() == name)
    }

    pub fn sql_name(&self) -> &'static str {
        match self {
            TelemetryColumn::ReportDate => "report_date",
            TelemetryColumn::ReportType => "report_type",
            TelemetryColumn::Ip => "ip",
            TelemetryColumn::Port => "port",
            TelemetryColumn::Asn => "asn",
            TelemetryColumn::Geo => "geo",
            TelemetryColumn::Hostname => "hostname",
            TelemetryColumn::Tag => "tag",
            TelemetryColumn::Severity => "severity",
            TelemetryColumn::IngestedAt => "ingested_at",
        }
    }

    /// Expression substring filters match against, in displayed form
    pub fn match_expr(&self) -> &'static str {
        match self {
            TelemetryColumn::Ip => IP_DISPLAY_SQL,
            other => other.sql_name(),
        }
    }
}

/// Resolved ORDER BY key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: TelemetryColumn,
    pub dir: SortDir,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            column: TelemetryColumn::ReportDate,
            dir: SortDir::Desc,
        }
    }
}

impl SortSpec {
    /// Resolve a requested sort.
    ///
    /// A missing or unrecognised column yields the default sort, whatever
    /// direction was asked for.
    pub fn resolve(column: Option<&str>, dir: SortDir) -> Self {
        match column.map(|name| (name, TelemetryColumn::from_name(name))) {
            None => Self::default(),
            Some((_, Some(column))) => Self { column, dir },
            Some((name, None)) => {
                warn!("Unknown sort column {:?}, using report_date desc", name);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trips_all() {
        for column in TelemetryColumn::ALL {
            assert_eq!(TelemetryColumn::from_name(column.sql_name()), Some(column));
        }
    }

    #[test]
    fn test_from_name_rejects_unknown_and_injection() {
        assert_eq!(TelemetryColumn::from_name("raw_data"), None);
        assert_eq!(TelemetryColumn::from_name("REPORT_DATE"), None);
        assert_eq!(TelemetryColumn::from_name("1;DROP TABLE ss_events"), None);
        assert_eq!(TelemetryColumn::from_name(""), None);
    }

    #[test]
    fn test_ip_matches_displayed_form() {
        assert_eq!(TelemetryColumn::Ip.match_expr(), IP_DISPLAY_SQL);
        assert_eq!(TelemetryColumn::Geo.match_expr(), "geo");
        assert_eq!(SEARCH_COLUMNS[0], IP_DISPLAY_SQL);
    }

    #[test]
    fn test_resolve_sort() {
        assert_eq!(SortSpec::resolve(None, SortDir::Asc), SortSpec::default());
        assert_eq!(
            SortSpec::resolve(Some("port"), SortDir::Asc),
            SortSpec {
                column: TelemetryColumn::Port,
                dir: SortDir::Asc
            }
        );
        assert_eq!(
            SortSpec::resolve(Some("1;DROP TABLE ss_events"), SortDir::Asc),
            SortSpec::default()
        );
    }
}
