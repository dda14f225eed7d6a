//! Paginated collection of upstream resources
//!
//! Walks a page-based endpoint (`?page=N&per_page=100`, 1-indexed) until the
//! upstream is exhausted and returns one flat record list.

use log::{debug, warn};
use serde_json::Value;

use super::IrisApi;
use crate::error::{ApiError, Result};
use crate::models::record::into_record;
use crate::models::{EntityData, Record};

/// Items requested per page
pub const PAGE_SIZE: usize = 100;

/// Hard cap on accumulated items; larger collections are truncated
pub const MAX_PAGINATED_ITEMS: usize = 10_000;

/// Fetch every page of `path`.
///
/// Stops on a short page, once the declared `total` is reached, or at the
/// safety cap (logged, truncated, not an error). A page whose `data` is an
/// object marks a non-paginated resource and is returned immediately. The
/// first upstream error aborts the walk and discards what was accumulated.
pub async fn collect_paginated<A: IrisApi + ?Sized>(api: &A, path: &str) -> Result<EntityData> {
    let mut page: usize = 1;
    let mut all_items: Vec<Record> = Vec::new();

    loop {
        debug!("Fetching {} page {}", path, page);
        let body = api
            .get_json(
                path,
                &[("page", page.to_string()), ("per_page", PAGE_SIZE.to_string())],
            )
            .await?;

        let (items, total) = match split_page(body, path)? {
            PageBody::Single(record) => return Ok(EntityData::Object(record)),
            PageBody::Items { items, total } => (items, total),
        };

        let page_len = items.len();
        all_items.extend(items);

        if total.is_some_and(|t| all_items.len() >= t) {
            break;
        }
        if page_len < PAGE_SIZE {
            break;
        }
        if all_items.len() >= MAX_PAGINATED_ITEMS {
            warn!(
                "Pagination limit reached ({} items) for {}",
                all_items.len(),
                path
            );
            all_items.truncate(MAX_PAGINATED_ITEMS);
            break;
        }
        page += 1;
    }

    debug!("Collected {} items from {}", all_items.len(), path);
    Ok(EntityData::List(all_items))
}

enum PageBody {
    Single(Record),
    Items {
        items: Vec<Record>,
        total: Option<usize>,
    },
}

/// Interpret one page body: `{"data": [...], "total": T}` or `{"data": {...}}`.
fn split_page(body: Value, path: &str) -> Result<PageBody> {
    let Value::Object(mut body) = body else {
        return Err(
            ApiError::InvalidResponse(format!("Expected a JSON object from {}", path)).into(),
        );
    };

    let total = body
        .get("total")
        .and_then(Value::as_u64)
        .map(|t| t as usize);

    match body.remove("data") {
        None | Some(Value::Null) => Ok(PageBody::Items {
            items: Vec::new(),
            total,
        }),
        Some(Value::Object(record)) => Ok(PageBody::Single(record)),
        Some(Value::Array(values)) => {
            let items = values
                .into_iter()
                .map(into_record)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| {
                    ApiError::InvalidResponse(format!("Non-object item in page from {}", path))
                })?;
            Ok(PageBody::Items { items, total })
        }
        Some(_) => Err(
            ApiError::InvalidResponse(format!("Unexpected `data` shape from {}", path)).into(),
        ),
    }
}
