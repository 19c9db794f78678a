//! Cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::CacheError;
use super::value_objects::EvictionPolicy;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Data cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Total payload bytes allowed, in MiB.
    pub max_size_mb: u64,
    /// Maximum number of entries.
    pub max_entries: usize,
    /// TTL for entries stored without an explicit one.
    #[serde(with = "shared_types::humantime_serde")]
    pub default_ttl: Duration,
    pub eviction_policy: EvictionPolicy,
    /// Period of the background expiry sweep.
    #[serde(with = "shared_types::humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_mb: 256,
            max_entries: 10_000,
            default_ttl: Duration::from_secs(3600),
            eviction_policy: EvictionPolicy::TtlOrLru,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// `CacheError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.max_size_mb == 0 {
            return Err(CacheError::Config("max_size_mb cannot be 0".into()));
        }
        if self.max_entries == 0 {
            return Err(CacheError::Config("max_entries cannot be 0".into()));
        }
        if self.default_ttl.as_millis() == 0 {
            return Err(CacheError::Config("default_ttl cannot be 0".into()));
        }
        if self.sweep_interval.as_millis() == 0 {
            return Err(CacheError::Config("sweep_interval cannot be 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_size_bytes(), 256 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_config() {
        let config = CacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::Config(_))));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CacheConfig = serde_json::from_str(
            r#"{"max_entries": 5, "default_ttl": "90s", "eviction_policy": "lru_only"}"#,
        )
        .unwrap();
        assert_eq!(config.max_entries, 5);
        assert_eq!(config.default_ttl, Duration::from_secs(90));
        assert_eq!(config.eviction_policy, EvictionPolicy::LruOnly);
        assert_eq!(config.max_size_mb, 256);
    }
}
