//! # CD-01 Data Cache
//!
//! Keyed store for payloads too large or too stateful to pass by value
//! through events (synthesized audio, images, long transcripts). Events carry
//! a `cache://<kind>/<digest>` reference instead; any component holding the
//! reference can `retrieve` from the shared instance.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O, no locks
//!   - `EntryStore`: LRU-ordered entry table, capacity accounting, eviction
//!   - `CacheKey`: content-addressed or unique `cache://` reference
//!   - `CacheConfig`: limits, default TTL, eviction policy, sweep period
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `DataCacheApi`: Driving port (inbound API)
//!
//! - **Service Layer** (`service.rs`): `DataCache`, the locked shared instance
//!
//! - **Sweeper** (`sweeper.rs`): background expiry task
//!
//! ## Lifecycle of an Entry
//!
//! ```text
//! store() ──→ [live] ──retrieve()──→ [live, MRU, access_count+1]
//!                │
//!                ├── ttl elapsed ──→ [expired] ──retrieve()/sweep──→ removed
//!                │
//!                └── capacity pressure ──→ evicted (per EvictionPolicy)
//! ```
//!
//! ## Guarantees
//!
//! - `retrieve` never returns an expired entry
//! - `retrieve` returns a copy; callers cannot mutate the stored payload
//! - `size_bytes` is the exact size counted against `max_size_mb`
//! - An entry larger than the whole cache is rejected without evicting
//!
//! ## Usage Example
//!
//! ```ignore
//! use cd_01_data_cache::{start_sweeper, CacheConfig, CachePayload, DataCache, DataCacheApi, StoreOptions};
//!
//! let cache = Arc::new(DataCache::new(CacheConfig::default())?);
//! let _sweeper = start_sweeper(&cache);
//!
//! let key = cache.store(CachePayload::Bytes(wav), StoreOptions::new().kind("audio")).await?;
//! bus.emit(topic, json!({ "audio_ref": key.to_string() }), "presentation.tts").await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod ports;
pub mod service;
pub mod sweeper;

pub use domain::{
    CacheConfig, CacheEntry, CacheError, CacheKey, CachePayload, CacheStats, EntryInfo,
    EvictionPolicy, StoreOptions, Tags,
};
pub use ports::DataCacheApi;
pub use service::DataCache;
pub use sweeper::{start_sweeper, start_sweeper_with_interval, SweeperHandle, MIN_SWEEP_INTERVAL};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    proptest! {
        /// Whatever is stored comes back unchanged before its TTL elapses.
        #[test]
        fn prop_round_trip(data in proptest::collection::vec(any::<u8>(), 0..4096), text in ".{0,200}") {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let cache = DataCache::new(CacheConfig::default()).unwrap();

                let bytes = CachePayload::Bytes(data.clone());
                let key = cache.store(bytes.clone(), StoreOptions::new()).await.unwrap();
                prop_assert_eq!(cache.retrieve(&key).await.unwrap(), bytes);

                let text = CachePayload::Text(text.clone());
                let key = cache.store(text.clone(), StoreOptions::new()).await.unwrap();
                prop_assert_eq!(cache.retrieve(&key).await.unwrap(), text);
                Ok(())
            })?;
        }

        /// Size and entry bounds hold after any sequence of stores.
        #[test]
        fn prop_bounds_hold(sizes in proptest::collection::vec(1usize..300_000, 1..40)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let config = CacheConfig {
                    max_size_mb: 1,
                    max_entries: 8,
                    eviction_policy: EvictionPolicy::LruOnly,
                    ..Default::default()
                };
                let cache = Arc::new(DataCache::new(config).unwrap());
                for size in sizes {
                    let payload = CachePayload::Bytes(vec![0u8; size]);
                    cache.store(payload, StoreOptions::new().unique()).await.unwrap();
                    let stats = cache.get_stats();
                    prop_assert!(stats.entry_count <= 8);
                    prop_assert!(stats.current_size_bytes <= 1024 * 1024);
                }
                Ok(())
            })?;
        }
    }
}
