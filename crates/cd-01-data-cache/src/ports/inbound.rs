//! Inbound Ports (Driving Ports)
//!
//! The API other components use to park and fetch large payloads.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{CacheError, CacheKey, CachePayload, CacheStats, EntryInfo, StoreOptions, Tags};

/// Primary data cache API (Driving Port)
#[async_trait]
pub trait DataCacheApi: Send + Sync {
    /// Store a payload and return its reference.
    ///
    /// Storing identical content again (without `unique`) replaces the
    /// previous entry under the same key.
    ///
    /// # Errors
    /// - `CacheError::Capacity` if it cannot fit after eviction
    /// - `CacheError::InvalidKey` for a bad `kind` label
    /// - `CacheError::InvalidTtl` for a zero TTL
    async fn store(&self, data: CachePayload, options: StoreOptions) -> Result<CacheKey, CacheError>;

    /// Fetch a copy of the payload.
    ///
    /// Updates `access_count`, `last_access_at`, and recency.
    ///
    /// # Errors
    /// `CacheError::NotFound` if absent or expired.
    async fn retrieve(&self, key: &CacheKey) -> Result<CachePayload, CacheError>;

    /// Remove an entry. Returns whether it existed.
    async fn delete(&self, key: &CacheKey) -> bool;

    /// Remove every entry.
    async fn clear(&self);

    /// Live entries carrying all of the given tags.
    async fn find_by_tags(&self, tags: &Tags) -> Vec<CacheKey>;

    /// Whether a live entry exists. Does not count as an access.
    async fn exists(&self, key: &CacheKey) -> bool;

    /// Metadata of a live entry. Does not count as an access.
    async fn entry_info(&self, key: &CacheKey) -> Option<EntryInfo>;

    /// Make a live entry expire `ttl` from now.
    ///
    /// # Errors
    /// `CacheError::NotFound` if absent or expired, `CacheError::InvalidTtl`
    /// for a zero TTL.
    async fn extend_ttl(&self, key: &CacheKey, ttl: Duration) -> Result<(), CacheError>;

    /// Snapshot of the counters.
    fn get_stats(&self) -> CacheStats;
}
