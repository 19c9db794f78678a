//! Domain layer: entries, keys, eviction rules. No I/O, no locking.

pub mod config;
pub mod entities;
pub mod errors;
pub mod store;
pub mod value_objects;

pub use config::CacheConfig;
pub use entities::{CacheEntry, CachePayload, CacheStats, EntryInfo, StoreOptions, Tags};
pub use errors::CacheError;
pub use store::EntryStore;
pub use value_objects::{CacheKey, EvictionPolicy, CACHE_SCHEME};
