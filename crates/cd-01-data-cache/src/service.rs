//! # Data Cache Service
//!
//! `DataCache` wraps the `EntryStore` with the two locks it needs to be
//! shared between request paths and the background sweeper:
//!
//! - `gate` (`tokio::sync::Mutex`): coordinates logical tasks; awaiting it
//!   yields to the scheduler instead of blocking a worker thread.
//! - `store` (`parking_lot::Mutex`): protects the table against true
//!   parallel access from runtime worker threads.
//!
//! Every read-modify-write holds both, gate first. The hard lock is never
//! held across an `.await`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{SystemTimeSource, TimeSource};
use tracing::{debug, warn};

use crate::domain::{
    CacheConfig, CacheEntry, CacheError, CacheKey, CachePayload, CacheStats, EntryInfo,
    EntryStore, StoreOptions, Tags,
};
use crate::ports::DataCacheApi;

/// Shared, bounded payload cache.
pub struct DataCache {
    config: CacheConfig,
    gate: tokio::sync::Mutex<()>,
    store: Mutex<EntryStore>,
    time_source: Arc<dyn TimeSource>,
}

impl DataCache {
    /// Create a cache using the system clock.
    ///
    /// # Errors
    ///
    /// `CacheError::Config` if the configuration is invalid.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        Self::with_time_source(config, Arc::new(SystemTimeSource))
    }

    /// Create a cache with an injected clock.
    ///
    /// # Errors
    ///
    /// `CacheError::Config` if the configuration is invalid.
    pub fn with_time_source(
        config: CacheConfig,
        time_source: Arc<dyn TimeSource>,
    ) -> Result<Self, CacheError> {
        config.validate()?;
        Ok(Self {
            store: Mutex::new(EntryStore::new(&config)),
            gate: tokio::sync::Mutex::new(()),
            config,
            time_source,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn ttl_ms(ttl: Duration) -> Result<u64, CacheError> {
        match u64::try_from(ttl.as_millis()) {
            Ok(0) => Err(CacheError::InvalidTtl),
            Ok(ms) => Ok(ms),
            Err(_) => Ok(u64::MAX),
        }
    }

    /// Live keys, most recently used first.
    pub async fn keys(&self) -> Vec<CacheKey> {
        let _gate = self.gate.lock().await;
        let now = self.time_source.now();
        self.store.lock().keys(now)
    }

    /// Remove every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let _gate = self.gate.lock().await;
        let now = self.time_source.now();
        let removed = self.store.lock().purge_expired(now);
        if removed > 0 {
            debug!(removed, "Purged expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}

#[async_trait]
impl DataCacheApi for DataCache {
    async fn store(&self, data: CachePayload, options: StoreOptions) -> Result<CacheKey, CacheError> {
        let ttl_ms = Self::ttl_ms(options.ttl.unwrap_or(self.config.default_ttl))?;
        let kind = options
            .kind
            .as_deref()
            .unwrap_or_else(|| data.default_kind());
        let key = if options.unique {
            CacheKey::unique(kind)?
        } else {
            CacheKey::from_content(kind, &data.content_bytes())?
        };
        let size_bytes = data.size_bytes();

        let _gate = self.gate.lock().await;
        let now = self.time_source.now();
        let entry = CacheEntry {
            key: key.clone(),
            data,
            size_bytes,
            created_at: now,
            ttl_ms,
            tags: options.tags,
            access_count: 0,
            last_access_at: now,
        };

        let result = self.store.lock().insert(entry, now);
        match result {
            Ok(evicted) => {
                if !evicted.is_empty() {
                    debug!(key = %key, evicted = evicted.len(), "Evicted entries to make room");
                }
                debug!(key = %key, size_bytes, ttl_ms, "Cache entry stored");
                Ok(key)
            }
            Err(e) => {
                warn!(key = %key, size_bytes, error = %e, "Cache store rejected");
                Err(e)
            }
        }
    }

    async fn retrieve(&self, key: &CacheKey) -> Result<CachePayload, CacheError> {
        let _gate = self.gate.lock().await;
        let now = self.time_source.now();
        let mut store = self.store.lock();
        match store.get(key, now) {
            Some(entry) => Ok(entry.data.clone()),
            None => {
                debug!(key = %key, "Cache miss");
                Err(CacheError::NotFound(key.clone()))
            }
        }
    }

    async fn delete(&self, key: &CacheKey) -> bool {
        let _gate = self.gate.lock().await;
        self.store.lock().remove(key)
    }

    async fn clear(&self) {
        let _gate = self.gate.lock().await;
        self.store.lock().clear();
        debug!("Cache cleared");
    }

    async fn find_by_tags(&self, tags: &Tags) -> Vec<CacheKey> {
        let _gate = self.gate.lock().await;
        let now = self.time_source.now();
        self.store.lock().find_by_tags(tags, now)
    }

    async fn exists(&self, key: &CacheKey) -> bool {
        let _gate = self.gate.lock().await;
        let now = self.time_source.now();
        self.store.lock().peek(key, now).is_some()
    }

    async fn entry_info(&self, key: &CacheKey) -> Option<EntryInfo> {
        let _gate = self.gate.lock().await;
        let now = self.time_source.now();
        self.store.lock().peek(key, now).map(CacheEntry::info)
    }

    async fn extend_ttl(&self, key: &CacheKey, ttl: Duration) -> Result<(), CacheError> {
        let ttl_ms = Self::ttl_ms(ttl)?;
        let _gate = self.gate.lock().await;
        let now = self.time_source.now();
        self.store.lock().extend_ttl(key, ttl_ms, now)
    }

    fn get_stats(&self) -> CacheStats {
        self.store.lock().stats()
    }
}
