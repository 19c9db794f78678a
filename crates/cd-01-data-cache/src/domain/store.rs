//! # Entry Store
//!
//! The entry table with its capacity accounting and eviction rules. Pure
//! logic: time is passed in, locking is the service's concern.
//!
//! ## Eviction
//!
//! | Policy | Victim | Fails when |
//! |--------|--------|------------|
//! | `TtlOnly` | every expired entry | still no room after the purge |
//! | `LruOnly` | least recently used | never, unless the entry itself is too big |
//! | `TtlOrLru` | oldest expired, else least recently used | as `LruOnly` |
//! | `TtlAndLru` | least recently used among the expired | nothing expired is left |
//!
//! An entry larger than the whole cache fails up front and evicts nothing.

use lru::LruCache;
use shared_types::Timestamp;

use super::config::CacheConfig;
use super::entities::{CacheEntry, CacheStats, Tags};
use super::errors::CacheError;
use super::value_objects::{CacheKey, EvictionPolicy};

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

/// Entry table ordered by recency of use.
pub struct EntryStore {
    entries: LruCache<CacheKey, CacheEntry>,
    current_size: u64,
    max_size_bytes: u64,
    max_entries: usize,
    policy: EvictionPolicy,
    counters: Counters,
}

impl EntryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            // Bounds are enforced here, not by the LRU itself.
            entries: LruCache::unbounded(),
            current_size: 0,
            max_size_bytes: config.max_size_bytes(),
            max_entries: config.max_entries,
            policy: config.eviction_policy,
            counters: Counters::default(),
        }
    }

    /// Insert an entry, evicting per policy if needed. An entry with the same
    /// key is replaced.
    ///
    /// Returns the keys evicted to make room.
    ///
    /// # Errors
    ///
    /// `CacheError::Capacity` if the entry cannot fit. A replaced entry is
    /// restored in that case.
    pub fn insert(
        &mut self,
        entry: CacheEntry,
        now: Timestamp,
    ) -> Result<Vec<CacheKey>, CacheError> {
        let size = entry.size_bytes;
        if size > self.max_size_bytes {
            return Err(CacheError::Capacity {
                size_bytes: size,
                reason: format!("entry larger than cache ({} bytes)", self.max_size_bytes),
            });
        }

        let previous = self.entries.pop(&entry.key);
        if let Some(prev) = &previous {
            self.current_size -= prev.size_bytes;
        }

        match self.make_room(size, now) {
            Ok(evicted) => {
                self.current_size += size;
                self.entries.put(entry.key.clone(), entry);
                Ok(evicted)
            }
            Err(e) => {
                if let Some(prev) = previous {
                    self.current_size += prev.size_bytes;
                    self.entries.put(prev.key.clone(), prev);
                }
                Err(e)
            }
        }
    }

    fn fits(&self, size: u64) -> bool {
        self.entries.len() < self.max_entries
            && self.current_size.saturating_add(size) <= self.max_size_bytes
    }

    fn make_room(&mut self, size: u64, now: Timestamp) -> Result<Vec<CacheKey>, CacheError> {
        let mut evicted = Vec::new();
        if self.fits(size) {
            return Ok(evicted);
        }

        if self.policy == EvictionPolicy::TtlOnly {
            for key in self.expired_keys(now) {
                self.evict(&key);
                evicted.push(key);
            }
        } else {
            while !self.fits(size) {
                let Some(victim) = self.next_victim(now) else {
                    break;
                };
                self.evict(&victim);
                evicted.push(victim);
            }
        }

        if self.fits(size) {
            Ok(evicted)
        } else {
            Err(CacheError::Capacity {
                size_bytes: size,
                reason: format!(
                    "no evictable entry under {:?} ({} entries, {} bytes used)",
                    self.policy,
                    self.entries.len(),
                    self.current_size
                ),
            })
        }
    }

    fn next_victim(&self, now: Timestamp) -> Option<CacheKey> {
        match self.policy {
            EvictionPolicy::LruOnly => self.lru_key(),
            EvictionPolicy::TtlOrLru => self.oldest_expired_key(now).or_else(|| self.lru_key()),
            EvictionPolicy::TtlOnly | EvictionPolicy::TtlAndLru => self.oldest_expired_key(now),
        }
    }

    fn lru_key(&self) -> Option<CacheKey> {
        self.entries.peek_lru().map(|(k, _)| k.clone())
    }

    /// Least recently used entry among the expired ones.
    fn oldest_expired_key(&self, now: Timestamp) -> Option<CacheKey> {
        self.entries
            .iter()
            .rev()
            .find(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
    }

    fn expired_keys(&self, now: Timestamp) -> Vec<CacheKey> {
        self.entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn remove_entry(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.current_size -= entry.size_bytes;
        Some(entry)
    }

    fn evict(&mut self, key: &CacheKey) {
        if self.remove_entry(key).is_some() {
            self.counters.evictions += 1;
        }
    }

    fn expire(&mut self, key: &CacheKey) {
        if self.remove_entry(key).is_some() {
            self.counters.expirations += 1;
        }
    }

    /// Look up a live entry, recording the access and marking it most
    /// recently used. An expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &CacheKey, now: Timestamp) -> Option<&CacheEntry> {
        let expired = match self.entries.peek(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.counters.misses += 1;
                return None;
            }
        };
        if expired {
            self.expire(key);
            self.counters.misses += 1;
            return None;
        }

        self.counters.hits += 1;
        let entry = self.entries.get_mut(key)?;
        entry.access_count += 1;
        entry.last_access_at = now;
        Some(&*entry)
    }

    /// Look up a live entry without touching recency or counters.
    pub fn peek(&self, key: &CacheKey, now: Timestamp) -> Option<&CacheEntry> {
        self.entries.peek(key).filter(|e| !e.is_expired(now))
    }

    pub fn remove(&mut self, key: &CacheKey) -> bool {
        self.remove_entry(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_size = 0;
    }

    /// Live entries carrying every given tag, most recently used first.
    pub fn find_by_tags(&self, tags: &Tags, now: Timestamp) -> Vec<CacheKey> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now) && e.matches_tags(tags))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Live keys, most recently used first.
    pub fn keys(&self, now: Timestamp) -> Vec<CacheKey> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Make a live entry expire `ttl_ms` from now.
    ///
    /// # Errors
    ///
    /// `CacheError::NotFound` if absent or already expired.
    pub fn extend_ttl(
        &mut self,
        key: &CacheKey,
        ttl_ms: u64,
        now: Timestamp,
    ) -> Result<(), CacheError> {
        match self.entries.peek_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.ttl_ms = now.saturating_sub(entry.created_at).saturating_add(ttl_ms);
                Ok(())
            }
            _ => Err(CacheError::NotFound(key.clone())),
        }
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self, now: Timestamp) -> usize {
        let expired = self.expired_keys(now);
        for key in &expired {
            self.expire(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits,
            misses: self.counters.misses,
            evictions: self.counters.evictions,
            expirations: self.counters.expirations,
            current_size_bytes: self.current_size,
            entry_count: self.entries.len(),
            max_size_bytes: self.max_size_bytes,
            max_entries: self.max_entries,
        }
    }
}
