//! Case data backends
//!
//! Both backends return the same entity shapes, so everything above this
//! layer (cache, query engines, correlation) is backend-agnostic.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{EntityData, EntityKind};

pub mod api;
pub mod db;

pub use api::ApiCaseSource;
pub use db::DbCaseSource;

/// Uncached access to case records
#[async_trait]
pub trait CaseSource: Send + Sync {
    /// List every case visible to the credential
    async fn list_cases(&self) -> Result<EntityData>;

    /// Fetch one entity collection (or the summary object) of a case
    async fn fetch_entity(&self, case_id: i64, kind: EntityKind) -> Result<EntityData>;
}
