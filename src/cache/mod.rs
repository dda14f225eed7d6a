//! In-process entity cache
//!
//! Holds fetched case entities for a bounded time (TTL) and a bounded number
//! of entries (LRU). One cache instance is shared by every request in the
//! process; keys are partitioned by a hash of the requesting credential.

pub mod clock;
pub mod key;
pub mod source;
pub mod store;

use std::time::Duration;

/// Default lifetime of a cached entity
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

pub use key::credential_hash;
pub use source::{CachedCaseSource, CaseData};
pub use store::{CacheStats, EntityCache};
