//! Mock case management API for testing
//!
//! Serves canned JSON bodies per path (and per page for paginated
//! endpoints) and records every request for assertions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::IrisApi;
use crate::error::{ApiError, Result};

/// Request captured by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

/// Mock API client.
///
/// # Example
/// ```ignore
/// let mock = MockIrisApi::new()
///     .with_pages("/api/v2/cases/1/assets", vec![page_a, page_b], Some(150));
/// ```
#[derive(Default)]
pub struct MockIrisApi {
    /// Bodies keyed by (path, page); page is `None` for unpaginated requests
    bodies: Arc<Mutex<HashMap<(String, Option<u32>), Value>>>,
    /// Paths that fail with the given error factory
    failures: Arc<Mutex<HashMap<String, fn() -> ApiError>>>,
    captured_requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockIrisApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve an unpaginated body at `path`
    pub fn with_body(self, path: &str, body: Value) -> Self {
        self.bodies
            .try_lock()
            .expect("mock not shared yet")
            .insert((path.to_string(), None), body);
        self
    }

    /// Serve `pages` (1-indexed) at `path`, each wrapped as `{"data": [...], "total": T}`
    pub fn with_pages(self, path: &str, pages: Vec<Vec<Value>>, total: Option<usize>) -> Self {
        {
            let mut bodies = self.bodies.try_lock().expect("mock not shared yet");
            for (idx, items) in pages.into_iter().enumerate() {
                let body = match total {
                    Some(t) => json!({ "data": items, "total": t }),
                    None => json!({ "data": items }),
                };
                bodies.insert((path.to_string(), Some(idx as u32 + 1)), body);
            }
        }
        self
    }

    /// Fail every request to `path`
    pub fn with_failure(self, path: &str, error: fn() -> ApiError) -> Self {
        self.failures
            .try_lock()
            .expect("mock not shared yet")
            .insert(path.to_string(), error);
        self
    }

    /// Number of requests made to `path`
    pub async fn call_count(&self, path: &str) -> usize {
        self.captured_requests
            .lock()
            .await
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// Total number of requests made
    pub async fn total_calls(&self) -> usize {
        self.captured_requests.lock().await.len()
    }

    /// All requests made, in order
    pub async fn captured(&self) -> Vec<CapturedRequest> {
        self.captured_requests.lock().await.clone()
    }

    /// Build `n` numbered records
    pub fn items(range: std::ops::Range<usize>) -> Vec<Value> {
        range.map(|i| json!({ "id": i, "name": format!("item-{}", i) })).collect()
    }
}

#[async_trait]
impl IrisApi for MockIrisApi {
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.captured_requests.lock().await.push(CapturedRequest {
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });

        if let Some(make_error) = self.failures.lock().await.get(path) {
            return Err(make_error().into());
        }

        let page = query
            .iter()
            .find(|(k, _)| *k == "page")
            .and_then(|(_, v)| v.parse::<u32>().ok());

        let bodies = self.bodies.lock().await;
        if let Some(body) = bodies.get(&(path.to_string(), page)) {
            return Ok(body.clone());
        }
        if page.is_some() {
            // Past the last configured page
            if bodies.keys().any(|(p, pg)| p == path && pg.is_some()) {
                return Ok(json!({ "data": [] }));
            }
        }
        if let Some(body) = bodies.get(&(path.to_string(), None)) {
            return Ok(body.clone());
        }
        Err(ApiError::NotFound(path.to_string()).into())
    }
}
