// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Merged record store.
//!
//! One logical dataset per domain, keyed by stable record identity.
//! Merging is an idempotent upsert: a later-fetched snapshot of an id
//! overwrites the earlier one (status fields change over time), and a
//! merge never deletes. The injected key-value cache is the durable
//! backing store; persistence is write-through on the caller's cadence.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::{self, namespaces, KeyValueCache};

/// Identity and ordering seam for anything the engine can merge.
pub trait MergeRecord: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Remote-assigned stable identity.
    fn record_id(&self) -> String;
    /// Epoch seconds used for cursor ordering.
    fn timestamp(&self) -> u64;
}

/// Cache key holding a domain's full merged record array.
#[must_use]
pub fn merged_key(domain: &str) -> String {
    format!("{domain}.merged")
}

/// Cache key holding a domain's last successful full-sync timestamp
/// (epoch millis).
#[must_use]
pub fn last_sync_key(domain: &str) -> String {
    format!("{domain}.lastSync")
}

/// Id-keyed merged dataset for one domain.
#[derive(Debug, Clone)]
pub struct MergedStore<R> {
    records: HashMap<String, R>,
}

impl<R: MergeRecord> MergedStore<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Insert or overwrite one record. Returns `true` when the id was
    /// not present before.
    pub fn upsert(&mut self, record: R) -> bool {
        self.records.insert(record.record_id(), record).is_none()
    }

    /// Merge a batch; most-recently-fetched wins ties. Returns how many
    /// ids were new.
    pub fn upsert_batch<I: IntoIterator<Item = R>>(&mut self, batch: I) -> usize {
        batch.into_iter().filter(|r| self.upsert(r.clone())).count()
    }

    /// Snapshot of the dataset, newest first; ties broken by id so the
    /// order is stable across runs.
    #[must_use]
    pub fn snapshot_desc(&self) -> Vec<R> {
        let mut records: Vec<R> = self.records.values().cloned().collect();
        records.sort_by(|a, b| {
            b.timestamp()
                .cmp(&a.timestamp())
                .then_with(|| a.record_id().cmp(&b.record_id()))
        });
        records
    }

    /// Keep only the `max` newest records.
    pub fn truncate_newest(&mut self, max: usize) {
        if self.records.len() <= max {
            return;
        }
        let keep: Vec<R> = self.snapshot_desc().into_iter().take(max).collect();
        self.records = keep
            .into_iter()
            .map(|r| (r.record_id(), r))
            .collect();
    }

    /// Seed a store from the domain's cached dataset. Corruption or an
    /// unavailable cache both start empty; sync rebuilds from the
    /// remote.
    pub async fn load(cache: &dyn KeyValueCache, domain: &str) -> Self {
        let mut store = Self::new();
        if let Some(records) = cache::fetch::<Vec<R>>(cache, namespaces::CACHE, &merged_key(domain)).await
        {
            debug!(domain, count = records.len(), "seeded merged store from cache");
            store.upsert_batch(records);
        }
        store
    }

    /// Write the full dataset through to the cache, newest first. Best
    /// effort: a failed write is logged and the in-memory data stays
    /// authoritative until the next persist.
    pub async fn persist(&self, cache: &dyn KeyValueCache, domain: &str) {
        cache::store(
            cache,
            namespaces::CACHE,
            &merged_key(domain),
            &self.snapshot_desc(),
            None::<Duration>,
        )
        .await;
    }
}

impl<R: MergeRecord> Default for MergedStore<R> {
    fn default() -> Self {
        Self::new()
    }
}
