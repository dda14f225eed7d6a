//! Bounded in-memory entity cache with TTL expiry and LRU eviction

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;

use super::clock::{Clock, SystemClock};
use super::key::{case_prefix, entity_key};
use crate::models::{EntityData, EntityKind};

/// Maximum number of entries held at once
pub const DEFAULT_CAPACITY: usize = 256;

struct CacheEntry {
    data: Arc<EntityData>,
    expires_at: DateTime<Utc>,
}

/// Entries plus recency order (front = most recently used)
#[derive(Default)]
struct LruState {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl LruState {
    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_front(key.to_string());
    }

    fn remove(&mut self, key: &str) -> bool {
        self.order.retain(|k| k != key);
        self.entries.remove(key).is_some()
    }
}

/// Process-wide cache of fetched case entities.
///
/// Shared by reference (`Arc<EntityCache>`) between concurrent requests. The
/// lock is held only for map bookkeeping, never across a fetch, so
/// unrelated keys never wait on each other's upstream calls.
pub struct EntityCache {
    state: Mutex<LruState>,
    ttl: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub expired_entries: usize,
    pub capacity: usize,
}

impl EntityCache {
    /// Create a cache with the default capacity and wall-clock time
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, DEFAULT_CAPACITY, Arc::new(SystemClock))
    }

    /// Create a cache with explicit capacity and time source
    pub fn with_clock(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(LruState::default()),
            ttl,
            capacity: capacity.max(1),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get unexpired data for `key`, marking it most recently used.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<Arc<EntityData>> {
        let now = self.clock.now();
        let mut state = self.lock();

        let fresh = match state.entries.get(key) {
            None => return None,
            Some(entry) => now < entry.expires_at,
        };

        if fresh {
            state.touch(key);
            state.entries.get(key).map(|e| Arc::clone(&e.data))
        } else {
            debug!("Cache entry expired: {}", key);
            state.remove(key);
            None
        }
    }

    /// Store `data` under `key` for one TTL, then evict least recently used
    /// entries while over capacity.
    pub fn set(&self, key: &str, data: Arc<EntityData>) {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut state = self.lock();

        state
            .entries
            .insert(key.to_string(), CacheEntry { data, expires_at });
        state.touch(key);

        while state.entries.len() > self.capacity {
            let Some(lru_key) = state.order.pop_back() else {
                break;
            };
            state.entries.remove(&lru_key);
            debug!("Cache evicted least recently used entry: {}", lru_key);
        }
    }

    /// Drop cached data for a case.
    ///
    /// With an entity, exactly that entity's key is removed; without one,
    /// every key of the (credential, case) pair goes. Returns the number of
    /// entries removed.
    pub fn invalidate(
        &self,
        credential_hash: &str,
        case_id: i64,
        entity: Option<EntityKind>,
    ) -> usize {
        let mut state = self.lock();
        let removed = match entity {
            Some(kind) => usize::from(state.remove(&entity_key(credential_hash, case_id, kind))),
            None => {
                let prefix = case_prefix(credential_hash, case_id);
                let doomed: Vec<String> = state
                    .entries
                    .keys()
                    .filter(|k| k.starts_with(&prefix))
                    .cloned()
                    .collect();
                doomed.iter().filter(|k| state.remove(k)).count()
            }
        };
        debug!(
            "Invalidated {} cache entries for case {} ({})",
            removed,
            case_id,
            entity.map(|e| e.as_str()).unwrap_or("all entities")
        );
        removed
    }

    /// Number of entries currently held, expired or not
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Occupancy statistics
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            expired_entries: state
                .entries
                .values()
                .filter(|e| now >= e.expires_at)
                .count(),
            capacity: self.capacity,
        }
    }

    /// Time-to-live applied to new entries
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
