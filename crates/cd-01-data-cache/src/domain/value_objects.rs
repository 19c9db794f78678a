//! Value objects: cache references and eviction policy.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::errors::CacheError;

/// URI scheme of cache references.
pub const CACHE_SCHEME: &str = "cache://";

/// Hex characters kept from the SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 12;

/// Reference to a cache entry, surfaced as `cache://<kind>/<12-hex-digest>`.
///
/// The string form is what travels inside event payloads; any component
/// holding it can `retrieve` from the shared cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    kind: String,
    digest: String,
}

impl CacheKey {
    /// Content-addressed key: first 12 hex chars of SHA-256(content).
    ///
    /// # Errors
    ///
    /// `CacheError::InvalidKey` if `kind` is not a valid kind label.
    pub fn from_content(kind: &str, content: &[u8]) -> Result<Self, CacheError> {
        validate_kind(kind)?;
        Ok(Self {
            kind: kind.to_string(),
            digest: short_digest(content),
        })
    }

    /// Unique key: digest of `kind` plus a random UUID.
    ///
    /// # Errors
    ///
    /// `CacheError::InvalidKey` if `kind` is not a valid kind label.
    pub fn unique(kind: &str) -> Result<Self, CacheError> {
        validate_kind(kind)?;
        let seed = format!("{kind}{}", uuid::Uuid::new_v4());
        Ok(Self {
            kind: kind.to_string(),
            digest: short_digest(seed.as_bytes()),
        })
    }

    /// Parse a `cache://<kind>/<digest>` reference.
    ///
    /// # Errors
    ///
    /// `CacheError::InvalidKey` on a wrong scheme, a bad kind, or a digest
    /// that is not 12 lowercase hex characters.
    pub fn parse(reference: &str) -> Result<Self, CacheError> {
        let invalid = || CacheError::InvalidKey(reference.to_string());

        let rest = reference.strip_prefix(CACHE_SCHEME).ok_or_else(invalid)?;
        let (kind, digest) = rest.split_once('/').ok_or_else(invalid)?;
        validate_kind(kind).map_err(|_| invalid())?;

        let digest_ok = digest.len() == DIGEST_HEX_LEN
            && digest
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !digest_ok {
            return Err(invalid());
        }

        Ok(Self {
            kind: kind.to_string(),
            digest: digest.to_string(),
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CACHE_SCHEME}{}/{}", self.kind, self.digest)
    }
}

impl std::str::FromStr for CacheKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CacheKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CacheKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn short_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = hex::encode(digest);
    hex.truncate(DIGEST_HEX_LEN);
    hex
}

/// Kinds are short lowercase labels: `[a-z0-9_-]+`.
fn validate_kind(kind: &str) -> Result<(), CacheError> {
    let ok = !kind.is_empty()
        && kind
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(format!("invalid kind: {kind:?}")))
    }
}

/// How the cache frees room for a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Purge expired entries only. Fails if that is not enough.
    TtlOnly,
    /// Evict least-recently-used entries regardless of expiry.
    LruOnly,
    /// Expired entries first, then least-recently-used.
    #[default]
    TtlOrLru,
    /// Evict the least-recently-used entry among the expired ones. Fails
    /// when nothing has expired.
    TtlAndLru,
}
