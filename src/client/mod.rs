//! Case management API client

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub mod iris;
#[cfg(test)]
pub mod mock;
pub mod pagination;

pub use iris::IrisClient;
#[cfg(test)]
pub use mock::MockIrisApi;
pub use pagination::collect_paginated;

/// Read-only access to the case management REST API.
///
/// Implementations return the decoded JSON body of a successful `GET`;
/// any non-success status is an error.
#[async_trait]
pub trait IrisApi: Send + Sync {
    /// `GET <path>?<query>` and decode the JSON body
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value>;
}
