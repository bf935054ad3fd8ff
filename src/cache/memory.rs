// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory cache implementation.
//!
//! Backed by a [`DashMap`] so display layers can read concurrently while
//! a synchronizer writes. Expiry is enforced lazily on `get`; a periodic
//! [`MemoryCache::sweep`] is available for long-lived processes that
//! want to reclaim memory from keys nobody reads anymore.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{epoch_ms, CacheEntry, CacheError, KeyValueCache};

/// Composite key: (namespace, key).
type FullKey = (String, String);

pub struct MemoryCache {
    entries: DashMap<FullKey, CacheEntry>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Total entry count across namespaces, expired entries included
    /// until they are swept or read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Physically remove every expired entry. Returns how many were
    /// dropped.
    pub fn sweep(&self) -> usize {
        let now = epoch_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, CacheError> {
        let full = (namespace.to_string(), key.to_string());
        let now = epoch_ms();

        if let Some(entry) = self.entries.get(&full) {
            if entry.is_expired_at(now) {
                drop(entry);
                self.entries.remove(&full);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.entries.insert(
            (namespace.to_string(), key.to_string()),
            CacheEntry::new(value, ttl),
        );
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), CacheError> {
        self.entries
            .remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    async fn delete_by_prefix(&self, namespace: &str, prefix: &str) -> Result<usize, CacheError> {
        let before = self.entries.len();
        self.entries
            .retain(|(ns, key), _| !(ns == namespace && key.starts_with(prefix)));
        Ok(before - self.entries.len())
    }

    async fn clear(&self, namespace: &str) -> Result<(), CacheError> {
        self.entries.retain(|(ns, _), _| ns != namespace);
        Ok(())
    }
}
