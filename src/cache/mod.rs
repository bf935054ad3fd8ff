//! Namespaced key-value cache with optional per-entry expiry.
//!
//! The cache is the durable backing store for merged datasets, per-page
//! response snapshots, and user settings. It is constructed once by the
//! embedding application and injected into the components that need it —
//! there is no ambient global store.
//!
//! # Failure policy
//!
//! Cache failures are never fatal. A read error, a write error, or an
//! unreadable stored value all surface as [`CacheError`], and callers are
//! expected to proceed as if the key were absent. The [`fetch`] and
//! [`store`] helpers encode that policy: they log and degrade to a miss.
//!
//! # Expiry
//!
//! An entry written with a TTL is logically absent once the TTL elapses.
//! Physical deletion is lazy: `get` removes an expired entry as a side
//! effect instead of returning stale data.

pub mod memory;

pub use memory::MemoryCache;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Well-known namespaces.
pub mod namespaces {
    /// Synced datasets and per-page response snapshots.
    pub const CACHE: &str = "cache";
    /// User-adjustable settings (record caps, etc.).
    pub const SETTINGS: &str = "settings";
}

#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing store could not be reached or refused the operation
    /// (quota, IO). Callers treat this as a miss.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    /// A stored value could not be decoded. Callers treat this as a miss.
    #[error("unreadable cached value for '{key}': {reason}")]
    Corruption { key: String, reason: String },
}

/// One stored entry.
///
/// If `expires_at` is set and now is past it, the entry is logically
/// absent regardless of whether it has been physically deleted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    /// Write time, epoch millis.
    pub stored_at: u64,
    /// Expiry deadline, epoch millis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        let now = epoch_ms();
        Self {
            value,
            stored_at: now,
            expires_at: ttl.map(|t| now.saturating_add(t.as_millis() as u64)),
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(deadline) if now_ms > deadline)
    }
}

/// Namespaced key-value store contract.
///
/// `set` overwrites unconditionally (last-writer-wins). No transactional
/// guarantees across keys. `get` must check expiry before returning and
/// must delete an expired entry as a side effect.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, CacheError>;

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), CacheError>;

    /// Delete every key in the namespace starting with `prefix`.
    /// Returns the number of entries removed.
    async fn delete_by_prefix(&self, namespace: &str, prefix: &str) -> Result<usize, CacheError>;

    /// Drop every entry in the namespace.
    async fn clear(&self, namespace: &str) -> Result<(), CacheError>;
}

/// Typed read that degrades to a miss on any cache failure.
pub async fn fetch<T: DeserializeOwned>(
    cache: &dyn KeyValueCache,
    namespace: &str,
    key: &str,
) -> Option<T> {
    match cache.get(namespace, key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(namespace, key, %err, "discarding unreadable cached value");
                let _ = cache.delete(namespace, key).await;
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            warn!(namespace, key, %err, "cache read failed, treating as miss");
            None
        }
    }
}

/// Typed best-effort write. A failed write is logged and swallowed —
/// the caller's data is still live in memory and re-persisted on the
/// next batch.
pub async fn store<T: Serialize>(
    cache: &dyn KeyValueCache,
    namespace: &str,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) {
    let value = match serde_json::to_value(value) {
        Ok(v) => v,
        Err(err) => {
            warn!(namespace, key, %err, "failed to encode value for cache");
            return;
        }
    };
    if let Err(err) = cache.set(namespace, key, value, ttl).await {
        warn!(namespace, key, %err, "cache write failed");
    }
}

/// Full reset: drops every well-known namespace. Used by the
/// logout/reset flow of the embedding application.
pub async fn reset_all(cache: &dyn KeyValueCache) -> Result<(), CacheError> {
    cache.clear(namespaces::CACHE).await?;
    cache.clear(namespaces::SETTINGS).await?;
    Ok(())
}

pub(crate) fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = CacheEntry::new(Value::from(1), None);
        assert!(!entry.is_expired_at(u64::MAX));
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let entry = CacheEntry {
            value: Value::from("x"),
            stored_at: 1_000,
            expires_at: Some(2_000),
        };
        assert!(!entry.is_expired_at(2_000));
        assert!(entry.is_expired_at(2_001));
    }

    #[tokio::test]
    async fn test_fetch_decodes_typed_value() {
        let cache = MemoryCache::new();
        store(&cache, namespaces::CACHE, "counts", &vec![1u32, 2, 3], None).await;

        let loaded: Option<Vec<u32>> = fetch(&cache, namespaces::CACHE, "counts").await;
        assert_eq!(loaded, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_fetch_treats_corrupt_value_as_miss() {
        let cache = MemoryCache::new();
        cache
            .set(namespaces::CACHE, "counts", Value::from("not a list"), None)
            .await
            .unwrap();

        let loaded: Option<Vec<u32>> = fetch(&cache, namespaces::CACHE, "counts").await;
        assert_eq!(loaded, None);

        // The unreadable entry is dropped, not left to fail again.
        let raw = cache.get(namespaces::CACHE, "counts").await.unwrap();
        assert!(raw.is_none());
    }

    #[tokio::test]
    async fn test_reset_all_clears_every_namespace() {
        let cache = MemoryCache::new();
        store(&cache, namespaces::CACHE, "a", &1u32, None).await;
        store(&cache, namespaces::SETTINGS, "b", &2u32, None).await;

        reset_all(&cache).await.unwrap();

        assert!(cache.get(namespaces::CACHE, "a").await.unwrap().is_none());
        assert!(cache.get(namespaces::SETTINGS, "b").await.unwrap().is_none());
    }
}
