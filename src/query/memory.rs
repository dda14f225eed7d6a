//! In-memory search, filter, sort and paging over cached records

use super::{QueryRequest, QueryResult, SortDir};
use crate::models::Record;
use crate::models::record::field_text;

/// Answer `request` over `records`.
///
/// Filtering keeps a record when the global term occurs in any field and
/// every column filter occurs in its own field (all matches are
/// case-insensitive substrings). Sorting compares lower-cased string forms
/// and is stable, so ties keep their input order in either direction.
pub fn query_records(records: &[Record], request: &QueryRequest) -> QueryResult {
    let search = request.search_term().map(str::to_lowercase);
    let filters: Vec<(&str, String)> = request
        .active_filters()
        .map(|(col, value)| (col, value.to_lowercase()))
        .collect();

    let mut matched: Vec<&Record> = records
        .iter()
        .filter(|r| search.as_deref().is_none_or(|term| matches_any_field(r, term)))
        .filter(|r| {
            filters
                .iter()
                .all(|(col, term)| field_text(r.get(*col)).contains(term.as_str()))
        })
        .collect();

    if let Some(column) = request.sort_column.as_deref() {
        sort_by_column(&mut matched, column, request.sort_dir);
    }

    let (offset, limit) = request.window();
    let data = matched
        .iter()
        .skip(offset)
        .take(limit)
        .map(|r| (*r).clone())
        .collect();

    QueryResult {
        draw: request.draw.clone(),
        records_total: records.len() as u64,
        records_filtered: matched.len() as u64,
        data,
    }
}

fn matches_any_field(record: &Record, term: &str) -> bool {
    record.values().any(|v| field_text(Some(v)).contains(term))
}

fn sort_by_column(records: &mut [&Record], column: &str, dir: SortDir) {
    let mut keyed: Vec<(String, &Record)> = records
        .iter()
        .map(|r| (field_text(r.get(column)), *r))
        .collect();

    // stable sort with a flipped comparator: ties keep input order in both directions
    keyed.sort_by(|(a, _), (b, _)| match dir {
        SortDir::Asc => a.cmp(b),
        SortDir::Desc => b.cmp(a),
    });

    for (slot, (_, record)) in records.iter_mut().zip(keyed) {
        *slot = record;
    }
}
