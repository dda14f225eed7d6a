//! Command execution context
//!
//! Provides a unified context for command execution: config loading with
//! flag overrides, case source construction, the process-wide entity cache
//! and the telemetry database.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::cache::{CacheStats, CachedCaseSource, EntityCache, credential_hash};
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::IrisClient;
use crate::config::{Config, DataSource};
use crate::error::Result;
use crate::explorer::Explorer;
use crate::source::{ApiCaseSource, CaseSource, DbCaseSource};
use crate::telemetry::TelemetryDb;

/// Most case sources kept alive at once
const MAX_SOURCES: usize = 256;

/// Case sources keyed by credential hash, least recently used evicted first
#[derive(Default)]
struct SourcePool {
    sources: HashMap<String, Arc<dyn CaseSource>>,
    order: VecDeque<String>,
}

impl SourcePool {
    fn get(&mut self, key: &str) -> Option<Arc<dyn CaseSource>> {
        let source = self.sources.get(key).map(Arc::clone)?;
        self.order.retain(|k| k != key);
        self.order.push_front(key.to_string());
        Some(source)
    }

    fn insert(&mut self, key: String, source: Arc<dyn CaseSource>) {
        while self.sources.len() >= MAX_SOURCES {
            let Some(oldest) = self.order.pop_back() else {
                break;
            };
            self.sources.remove(&oldest);
        }
        self.order.retain(|k| k != &key);
        self.order.push_front(key.clone());
        self.sources.insert(key, source);
    }
}

/// Context for command execution containing config, cache, and runtime options.
///
/// Case sources are built lazily per credential and reused, so commands that
/// only touch telemetry never need an API key. Each credential seen in batch
/// mode keeps its own HTTP client and rate limiter while it stays among the
/// most recently used.
pub struct CommandContext {
    /// Loaded configuration with CLI overrides applied
    pub config: Config,
    /// Output format preference
    pub format: OutputFormat,
    /// Whether reads bypass the cache
    pub refresh: bool,
    cache: Arc<EntityCache>,
    sources: Mutex<SourcePool>,
}

impl CommandContext {
    /// Create a new command context.
    ///
    /// # Errors
    /// Returns error if config cannot be loaded or is invalid.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let mut config = Config::load_at(opts.config_ref())?;
        opts.apply_to(&mut config);
        config.validate()?;

        let cache = Arc::new(EntityCache::new(config.cache_ttl()));
        debug!(
            "Using {:?} case source, cache TTL {:?}",
            config.data_source,
            cache.ttl()
        );

        Ok(Self {
            cache,
            config,
            format: opts.format,
            refresh: opts.refresh,
            sources: Mutex::new(SourcePool::default()),
        })
    }

    /// The configured credential for the active backend
    fn default_credential(&self) -> Result<String> {
        match self.config.data_source {
            DataSource::Api => Ok(self.config.require_api_key()?.to_string()),
            DataSource::Db => Ok(DbCaseSource::new(self.config.require_case_db()?).credential()),
        }
    }

    fn build_source(&self, credential: &str) -> Result<Arc<dyn CaseSource>> {
        match self.config.data_source {
            DataSource::Api => {
                let client = IrisClient::new(
                    &self.config.iris_url,
                    credential,
                    self.config.verify_ssl,
                    self.config.request_timeout(),
                    self.config.rate_limit_per_second,
                )?;
                debug!("Reading cases from {}", client.base_url());
                Ok(Arc::new(ApiCaseSource::new(client)))
            }
            DataSource::Db => {
                let source = DbCaseSource::new(self.config.require_case_db()?);
                debug!("Reading cases from {}", source.path().display());
                Ok(Arc::new(source))
            }
        }
    }

    fn source_for(&self, credential: &str) -> Result<Arc<dyn CaseSource>> {
        let key = credential_hash(credential);
        let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(source) = sources.get(&key) {
            return Ok(source);
        }
        let source = self.build_source(credential)?;
        sources.insert(key, Arc::clone(&source));
        Ok(source)
    }

    /// An explorer acting as `credential`, or as the configured credential.
    ///
    /// Every explorer reads through the same cache; entries are partitioned
    /// by credential hash.
    pub fn explorer_for(&self, credential: Option<&str>) -> Result<Explorer> {
        let credential = match credential {
            Some(c) if !c.trim().is_empty() => c.to_string(),
            _ => self.default_credential()?,
        };
        let source = self.source_for(&credential)?;
        Ok(Explorer::new(
            CachedCaseSource::new(source, Arc::clone(&self.cache), &credential),
            self.config.telemetry_db.clone().map(TelemetryDb::new),
        ))
    }

    /// An explorer acting as the configured credential
    pub fn explorer(&self) -> Result<Explorer> {
        self.explorer_for(None)
    }

    /// The telemetry database, for commands that need nothing else
    pub fn require_telemetry(&self) -> Result<TelemetryDb> {
        let db = TelemetryDb::new(self.config.require_telemetry_db()?);
        debug!("Reading telemetry from {}", db.path().display());
        Ok(db)
    }

    /// Occupancy of the shared entity cache
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
