//! Cache entries and the records derived from them.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::Timestamp;

use super::value_objects::CacheKey;

/// Tags attached to an entry, matched exactly by `find_by_tags`.
pub type Tags = BTreeMap<String, String>;

/// Opaque data held by the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CachePayload {
    Bytes(Vec<u8>),
    Text(String),
    Json(serde_json::Value),
}

impl CachePayload {
    /// Bytes hashed for the content-addressed key and counted against
    /// capacity.
    pub fn content_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bytes(b) => b.clone(),
            Self::Text(s) => s.as_bytes().to_vec(),
            Self::Json(v) => v.to_string().into_bytes(),
        }
    }

    /// Size used for capacity accounting.
    pub fn size_bytes(&self) -> u64 {
        match self {
            Self::Bytes(b) => b.len() as u64,
            Self::Text(s) => s.len() as u64,
            Self::Json(v) => v.to_string().len() as u64,
        }
    }

    /// Kind label used when the caller does not supply one.
    pub fn default_kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
        }
    }
}

impl From<Vec<u8>> for CachePayload {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<String> for CachePayload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for CachePayload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<serde_json::Value> for CachePayload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// A stored entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub data: CachePayload,
    pub size_bytes: u64,
    pub created_at: Timestamp,
    /// Lifetime in milliseconds, measured from `created_at`.
    pub ttl_ms: u64,
    pub tags: Tags,
    pub access_count: u64,
    pub last_access_at: Timestamp,
}

impl CacheEntry {
    /// Expired once `ttl` has fully elapsed since creation.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.saturating_sub(self.created_at) >= self.ttl_ms
    }

    pub fn expires_at(&self) -> Timestamp {
        self.created_at.saturating_add(self.ttl_ms)
    }

    pub fn matches_tags(&self, wanted: &Tags) -> bool {
        wanted
            .iter()
            .all(|(k, v)| self.tags.get(k).is_some_and(|have| have == v))
    }

    pub fn info(&self) -> EntryInfo {
        EntryInfo {
            key: self.key.clone(),
            size_bytes: self.size_bytes,
            created_at: self.created_at,
            ttl_seconds: self.ttl_ms / 1000,
            expires_at: self.expires_at(),
            tags: self.tags.clone(),
            access_count: self.access_count,
            last_access_at: self.last_access_at,
        }
    }
}

/// Entry metadata without the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub key: CacheKey,
    pub size_bytes: u64,
    pub created_at: Timestamp,
    pub ttl_seconds: u64,
    pub expires_at: Timestamp,
    pub tags: Tags,
    pub access_count: u64,
    pub last_access_at: Timestamp,
}

/// Per-store options.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Overrides `CacheConfig::default_ttl`.
    pub ttl: Option<Duration>,
    pub tags: Tags,
    /// Overrides the payload's default kind label.
    pub kind: Option<String>,
    /// Random key instead of a content hash; identical content stored
    /// twice then yields two entries.
    pub unique: bool,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Immutable snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries removed to make room for a new one.
    pub evictions: u64,
    /// Expired entries removed lazily or by the sweeper.
    pub expirations: u64,
    pub current_size_bytes: u64,
    pub entry_count: usize,
    pub max_size_bytes: u64,
    pub max_entries: usize,
}

impl CacheStats {
    /// hits / (hits + misses), 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
