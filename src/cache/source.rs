//! Cached wrapper for case sources
//!
//! Every read goes through the shared [`EntityCache`] under a key derived
//! from the credential hash, so distinct credentials never see each other's
//! entries.

use std::future::Future;
use std::sync::Arc;

use futures::future::try_join_all;
use log::debug;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use super::key::{cases_list_key, credential_hash, entity_key};
use super::store::EntityCache;
use crate::error::Result;
use crate::models::{EntityData, EntityKind};
use crate::source::CaseSource;

/// A case source reading through the process-wide entity cache.
///
/// Cheap to construct per credential; the cache itself is shared.
pub struct CachedCaseSource<S: CaseSource + ?Sized> {
    inner: Arc<S>,
    cache: Arc<EntityCache>,
    credential_hash: String,
}

/// Every entity of one case, in [`EntityKind::ALL`] order
#[derive(Debug, Clone)]
pub struct CaseData(pub Vec<(EntityKind, Arc<EntityData>)>);

impl Serialize for CaseData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (kind, data) in &self.0 {
            map.serialize_entry(kind.as_str(), data.as_ref())?;
        }
        map.end()
    }
}

impl<S: CaseSource + ?Sized> CachedCaseSource<S> {
    pub fn new(inner: Arc<S>, cache: Arc<EntityCache>, credential: &str) -> Self {
        Self {
            inner,
            cache,
            credential_hash: credential_hash(credential),
        }
    }

    /// Serve `key` from cache unless `bypass` is set; on a miss (or bypass)
    /// fetch and write the fresh value back. Errors are never cached.
    async fn read_through<F, Fut>(&self, key: &str, bypass: bool, fetch: F) -> Result<Arc<EntityData>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<EntityData>>,
    {
        if bypass {
            debug!("Cache bypass: {}", key);
        } else if let Some(hit) = self.cache.get(key) {
            debug!("Cache hit: {}", key);
            return Ok(hit);
        } else {
            debug!("Cache miss: {}", key);
        }

        let data = Arc::new(fetch().await?);
        self.cache.set(key, Arc::clone(&data));
        Ok(data)
    }

    /// One entity of a case
    pub async fn entity(&self, case_id: i64, kind: EntityKind, bypass: bool) -> Result<Arc<EntityData>> {
        let key = entity_key(&self.credential_hash, case_id, kind);
        self.read_through(&key, bypass, || self.inner.fetch_entity(case_id, kind))
            .await
    }

    /// The case listing for this credential
    pub async fn cases(&self, bypass: bool) -> Result<Arc<EntityData>> {
        let key = cases_list_key(&self.credential_hash);
        self.read_through(&key, bypass, || self.inner.list_cases()).await
    }

    /// All seven entities of a case, fetched concurrently.
    ///
    /// The first failure fails the whole fetch.
    pub async fn case_data(&self, case_id: i64, bypass: bool) -> Result<CaseData> {
        let fetches = EntityKind::ALL.into_iter().map(|kind| async move {
            let data = self.entity(case_id, kind, bypass).await?;
            Result::Ok((kind, data))
        });
        Ok(CaseData(try_join_all(fetches).await?))
    }

    /// Drop this credential's cached data for a case (one entity or all)
    pub fn invalidate(&self, case_id: i64, entity: Option<EntityKind>) -> usize {
        self.cache.invalidate(&self.credential_hash, case_id, entity)
    }
}
