//! Table output formatting

use tabled::builder::Builder;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

use crate::models::Record;
use crate::query::QueryResult;

/// Longest cell rendered before truncation
const MAX_CELL_WIDTH: usize = 40;

/// Format typed rows as a table
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

/// Format schemaless records; columns are the union of field names in
/// first-seen order.
pub fn format_records(records: &[Record]) -> String {
    if records.is_empty() {
        return "No results found.".to_string();
    }

    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_uppercase()));
    for record in records {
        builder.push_record(columns.iter().map(|c| cell_text(record.get(*c))));
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

fn cell_text(value: Option<&serde_json::Value>) -> String {
    let text = match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.replace('\n', " "),
        Some(other) => other.to_string(),
    };
    truncate_string(&text, MAX_CELL_WIDTH)
}

/// Truncate to `max_len` characters with an ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// "Showing 1-25 of 120 records (filtered from 300)"
pub fn page_footer(result: &QueryResult, start: usize) -> String {
    let shown = result.data.len();
    if shown == 0 {
        return format!("Showing 0 of {} records", result.records_filtered);
    }
    let mut footer = format!(
        "Showing {}-{} of {} records",
        start + 1,
        start + shown,
        result.records_filtered
    );
    if result.records_filtered != result.records_total {
        footer.push_str(&format!(" (filtered from {})", result.records_total));
    }
    footer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::into_record;
    use serde_json::json;

    #[derive(Debug, Tabled)]
    struct TestRow {
        #[tabled(rename = "ENTITY")]
        entity: String,
        #[tabled(rename = "RECORDS")]
        records: usize,
    }

    #[test]
    fn test_format_table_empty() {
        let items: Vec<TestRow> = vec![];
        assert_eq!(format_table(&items), "No results found.");
    }

    #[test]
    fn test_format_table_uses_rounded_style() {
        let items = vec![TestRow {
            entity: "assets".to_string(),
            records: 3,
        }];
        let result = format_table(&items);
        assert!(result.contains("ENTITY"));
        assert!(result.contains("assets"));
        // Rounded style uses ╭ for top-left corner
        assert!(result.contains("╭"));
    }

    #[test]
    fn test_format_records_unions_columns() {
        let records = vec![
            into_record(json!({"id": 1, "name": "alpha"})).unwrap(),
            into_record(json!({"id": 2, "ip": "10.0.0.1", "name": null})).unwrap(),
        ];
        let result = format_records(&records);

        assert!(result.contains("ID"));
        assert!(result.contains("NAME"));
        assert!(result.contains("IP"));
        assert!(result.contains("alpha"));
        assert!(result.contains("10.0.0.1"));
        assert!(!result.contains("null"));
    }

    #[test]
    fn test_format_records_empty() {
        assert_eq!(format_records(&[]), "No results found.");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_page_footer() {
        let mut result = QueryResult::empty(json!(null));
        result.records_total = 300;
        result.records_filtered = 120;
        result.data = vec![into_record(json!({"id": 1})).unwrap(); 25];
        assert_eq!(
            page_footer(&result, 25),
            "Showing 26-50 of 120 records (filtered from 300)"
        );

        result.records_total = 120;
        assert_eq!(page_footer(&result, 0), "Showing 1-25 of 120 records");

        let empty = QueryResult::empty(json!(null));
        assert_eq!(page_footer(&empty, 0), "Showing 0 of 0 records");
    }
}
