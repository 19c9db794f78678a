//! Error types for the data cache

use thiserror::Error;

use super::value_objects::CacheKey;

/// Errors returned by cache operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key absent or its entry expired.
    #[error("Cache entry not found or expired: {0}")]
    NotFound(CacheKey),

    /// Entry cannot fit even after eviction under the configured policy.
    #[error("Cache capacity exceeded storing {size_bytes} bytes: {reason}")]
    Capacity { size_bytes: u64, reason: String },

    /// Malformed `cache://` reference or kind label.
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// A TTL of zero was requested.
    #[error("TTL must be greater than zero")]
    InvalidTtl,

    /// Rejected configuration.
    #[error("Invalid cache configuration: {0}")]
    Config(String),
}
