//! Output formatting for CLI results

use colored::Colorize;
use tabled::Tabled;

use crate::cache::CaseData;
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::explorer::CorrelationResult;
use crate::query::QueryResult;
use crate::telemetry::TelemetryStats;

pub mod json;
pub mod table;

/// Trait for types that can be formatted for output
pub trait Formattable {
    /// Format the data according to the specified format
    fn format(&self, format: OutputFormat) -> Result<String>;
}

/// Format and print data to stdout
pub fn print<T: Formattable + ?Sized>(data: &T, format: OutputFormat) -> Result<()> {
    let output = data.format(format)?;
    println!("{}", output);
    Ok(())
}

/// A result page together with the offset it was requested at
pub struct Paged<'a, T> {
    pub inner: &'a T,
    pub start: usize,
}

impl<'a, T> Paged<'a, T> {
    pub fn new(inner: &'a T, start: i64) -> Self {
        Self {
            inner,
            start: start.max(0) as usize,
        }
    }
}

fn page_table(result: &QueryResult, start: usize) -> String {
    format!(
        "{}\n{}",
        table::format_records(&result.data),
        table::page_footer(result, start).as_str().dimmed()
    )
}

impl Formattable for Paged<'_, QueryResult> {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => Ok(page_table(self.inner, self.start)),
            OutputFormat::Json => Ok(json::format_json(self.inner)?),
        }
    }
}

fn source_line(name: &str, status: &str) -> String {
    let status = if status == "ok" {
        status.green()
    } else {
        status.yellow()
    };
    format!("  {}: {}", name, status)
}

impl Formattable for Paged<'_, CorrelationResult> {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => {
                let c = self.inner;
                Ok(format!(
                    "{} {} ips, {} hostnames, {} asns\n{}\n{}\n{}\n\n{}",
                    "Indicators:".bold(),
                    c.indicators.ips,
                    c.indicators.hostnames,
                    c.indicators.asns,
                    "Sources:".bold(),
                    source_line("iocs", &c.sources.iocs),
                    source_line("assets", &c.sources.assets),
                    page_table(&c.result, self.start)
                ))
            }
            OutputFormat::Json => Ok(json::format_json(self.inner)?),
        }
    }
}

#[derive(Tabled)]
struct EntityCountRow {
    #[tabled(rename = "ENTITY")]
    entity: &'static str,
    #[tabled(rename = "RECORDS")]
    records: usize,
}

impl Formattable for CaseData {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => {
                let rows: Vec<EntityCountRow> = self
                    .0
                    .iter()
                    .map(|(kind, data)| EntityCountRow {
                        entity: kind.as_str(),
                        records: data.len(),
                    })
                    .collect();
                Ok(table::format_table(&rows))
            }
            OutputFormat::Json => Ok(json::format_json(self)?),
        }
    }
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "STATISTIC")]
    name: &'static str,
    #[tabled(rename = "VALUE")]
    value: String,
}

impl Formattable for TelemetryStats {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => {
                let rows = vec![
                    StatRow {
                        name: "Total events",
                        value: self.total_events.to_string(),
                    },
                    StatRow {
                        name: "Report types",
                        value: self.report_types.to_string(),
                    },
                    StatRow {
                        name: "Earliest report",
                        value: self.earliest_date.clone().unwrap_or_else(|| "N/A".to_string()),
                    },
                    StatRow {
                        name: "Latest report",
                        value: self.latest_date.clone().unwrap_or_else(|| "N/A".to_string()),
                    },
                ];
                Ok(format!(
                    "{}\n\n{}\n{}",
                    table::format_table(&rows),
                    "Recent ingestion runs".bold(),
                    table::format_records(&self.recent_runs)
                ))
            }
            OutputFormat::Json => Ok(json::format_json(self)?),
        }
    }
}

#[derive(Tabled)]
struct ReportTypeRow<'a> {
    #[tabled(rename = "REPORT TYPE")]
    name: &'a str,
}

impl Formattable for Vec<String> {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => {
                let rows: Vec<ReportTypeRow> =
                    self.iter().map(|name| ReportTypeRow { name }).collect();
                Ok(table::format_table(&rows))
            }
            OutputFormat::Json => Ok(json::format_json(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::into_record;
    use serde_json::{Value, json};

    fn page() -> QueryResult {
        QueryResult {
            draw: json!(1),
            records_total: 10,
            records_filtered: 2,
            data: vec![
                into_record(json!({"id": 1, "ip": "8.8.8.8"})).unwrap(),
                into_record(json!({"id": 2, "ip": "10.0.0.5"})).unwrap(),
            ],
        }
    }

    #[test]
    fn test_page_table_has_rows_and_footer() {
        let result = page();
        let text = Paged::new(&result, 0).format(OutputFormat::Table).unwrap();
        assert!(text.contains("8.8.8.8"));
        assert!(text.contains("Showing 1-2 of 2 records"));
    }

    #[test]
    fn test_page_json_is_envelope() {
        let result = page();
        let text = Paged::new(&result, -3).format(OutputFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["data"]["recordsFiltered"], 2);
        assert_eq!(parsed["data"]["data"][1]["ip"], "10.0.0.5");
    }

    #[test]
    fn test_report_types_table() {
        let types = vec!["scan_http".to_string(), "scan_ssh".to_string()];
        let text = types.format(OutputFormat::Table).unwrap();
        assert!(text.contains("REPORT TYPE"));
        assert!(text.contains("scan_ssh"));
    }
}
