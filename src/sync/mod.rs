// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Paginated backfill synchronizer.
//!
//! One generic engine walks a domain's history backward through time:
//!
//! ```text
//! fetch live page ──▶ decode/parse ──▶ dedup ──▶ merge ──▶ persist
//!        ▲                                                   │
//!        │            cursor = oldest (timestamp, id)        │
//!        └────────────── stopping rules not met ◀────────────┘
//! ```
//!
//! Stopping rules, checked in order after each batch:
//! 1. empty batch — history exhausted
//! 2. zero unseen ids — no forward progress
//! 3. same oldest id twice — the server returned the same edge page
//! 4. unique-record cap reached — stop after this batch, truncate
//!
//! Pagination is an inherently sequential dependency chain (each page's
//! cursor comes from the previous response), so the loop is a single
//! task; the only suspension points are the network call and the
//! deliberate pacing delays. Cancellation is cooperative, observed at
//! the loop-top checkpoint.
//!
//! Progress is persisted after every batch: an interrupted run never
//! loses already-fetched data, and a re-invoked run resumes through the
//! per-page response cache instead of refetching.

pub mod cursor;
pub mod pacer;
pub mod progress;

pub use cursor::SyncCursor;
pub use pacer::RequestPacer;
pub use progress::{CancelToken, StopReason, SyncProgress, SyncReport};

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::cache::{self, epoch_ms, namespaces, KeyValueCache};
use crate::config::SyncConfig;
use crate::domains::{DecodedPage, SyncDomain};
use crate::error::SyncError;
use crate::metrics;
use crate::source::{PageQuery, RecordSource, SourceError};
use crate::store::{last_sync_key, merged_key, MergeRecord, MergedStore};

/// Cache key for one page's raw payload, keyed by the cursor that
/// requested it.
#[must_use]
pub fn page_key(domain: &str, before: u64) -> String {
    format!("{domain}.page.{before}")
}

/// Settings key for the user-adjustable record cap.
#[must_use]
pub fn max_records_key(domain: &str) -> String {
    format!("{domain}.maxRecords")
}

/// Load the persisted record cap, falling back to `default` on a miss.
pub async fn load_max_records(cache: &dyn KeyValueCache, domain: &str, default: usize) -> usize {
    cache::fetch::<usize>(cache, namespaces::SETTINGS, &max_records_key(domain))
        .await
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

/// Persist the record cap.
pub async fn save_max_records(cache: &dyn KeyValueCache, domain: &str, value: usize) {
    cache::store(
        cache,
        namespaces::SETTINGS,
        &max_records_key(domain),
        &value,
        None,
    )
    .await;
}

/// Generic backfill engine for one domain.
///
/// Owns the cursor for the lifetime of a run; the merged store owns
/// merge semantics; the injected cache is the durable backing store.
pub struct BackfillSynchronizer<D: SyncDomain> {
    domain: D,
    source: Arc<dyn RecordSource>,
    cache: Arc<dyn KeyValueCache>,
    config: SyncConfig,
    cancel: CancelToken,
    progress: watch::Sender<SyncProgress>,
    progress_rx: watch::Receiver<SyncProgress>,
}

impl<D: SyncDomain> BackfillSynchronizer<D> {
    pub fn new(
        domain: D,
        source: Arc<dyn RecordSource>,
        cache: Arc<dyn KeyValueCache>,
        config: SyncConfig,
    ) -> Self {
        let (progress, progress_rx) = watch::channel(SyncProgress::default());
        Self {
            domain,
            source,
            cache,
            config,
            cancel: CancelToken::new(),
            progress,
            progress_rx,
        }
    }

    /// Token for cancelling the run from another task.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Watch the run's progress; updated after every page.
    #[must_use]
    pub fn progress_receiver(&self) -> watch::Receiver<SyncProgress> {
        self.progress_rx.clone()
    }

    /// Run one backfill to completion, a stopping rule, cancellation, or
    /// failure.
    ///
    /// # Errors
    ///
    /// [`SyncError::Authorization`] when the credential lacks the
    /// domain's scope — fatal, surfaced verbatim. [`SyncError::Transient`]
    /// on any network/decoding failure — progress persisted so far stays
    /// valid and the run is safely retryable.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let domain = self.domain.key();
        let mut timer = metrics::RunTimer::new(domain);

        if let Some(report) = self.freshness_gate().await {
            timer.set_outcome(report.stop_reason.as_str());
            return Ok(report);
        }

        let mut store = MergedStore::load(self.cache.as_ref(), domain).await;
        let mut pacer = RequestPacer::new(
            self.config.request_delay(),
            self.config.requests_per_batch,
            self.config.batch_pause(),
        );

        let mut seen: HashSet<String> = HashSet::new();
        let mut fetched_total = 0usize;
        let mut parse_misses = 0usize;
        let mut pages = 0u32;
        let mut prev_cursor: Option<SyncCursor> = None;

        let stop = loop {
            // Loop-top checkpoint: the only place cancellation is
            // observed.
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let before = prev_cursor.as_ref().map(|c| c.oldest_timestamp);
            let page = match self.fetch_decoded(before, &mut pacer).await {
                Ok(page) => page,
                Err(err) => {
                    store.persist(self.cache.as_ref(), domain).await;
                    timer.set_outcome(if err.is_fatal() {
                        "authorization"
                    } else {
                        "transient"
                    });
                    return Err(err.into());
                }
            };
            pages += 1;
            parse_misses += page.parse_misses;
            fetched_total += page.records.len();

            // Rule 1: exhausted.
            if page.records.is_empty() {
                break StopReason::Exhausted;
            }

            let unseen = page
                .records
                .iter()
                .filter(|r| seen.insert(MergeRecord::record_id(*r)))
                .count();
            let next_cursor = SyncCursor::from_records(&page.records);

            // Merge the whole batch: a later-fetched snapshot of an id
            // overwrites the cached one. Persist so interruption never
            // loses this batch.
            let new_ids = store.upsert_batch(page.records.iter().cloned());
            metrics::record_merged(domain, new_ids);
            store.persist(self.cache.as_ref(), domain).await;

            self.progress.send_replace(SyncProgress {
                fetched: fetched_total,
                unique: seen.len(),
                target: self.config.max_records,
                requests: pacer.requests(),
            });
            debug!(
                domain,
                pages,
                unique = seen.len(),
                unseen,
                "merged batch"
            );

            // Rule 2: no forward progress.
            if unseen == 0 {
                break StopReason::NoForwardProgress;
            }

            // Rule 3: cursor cycle.
            if let (Some(prev), Some(next)) = (&prev_cursor, &next_cursor) {
                if prev.oldest_id == next.oldest_id {
                    break StopReason::CursorCycle;
                }
            }

            // Rule 4: cap reached (after merging this batch).
            if seen.len() >= self.config.max_records {
                break StopReason::MaxRecords;
            }

            prev_cursor = next_cursor;
        };

        store.truncate_newest(self.config.max_records);
        store.persist(self.cache.as_ref(), domain).await;

        if stop.is_complete() {
            cache::store(
                self.cache.as_ref(),
                namespaces::CACHE,
                &last_sync_key(domain),
                &epoch_ms(),
                None,
            )
            .await;
        }

        if parse_misses > 0 {
            warn!(domain, parse_misses, "dropped lines no pattern recognized");
        }
        metrics::record_parse_misses(domain, parse_misses);
        timer.set_outcome(stop.as_str());
        info!(
            domain,
            %stop,
            unique = store.len(),
            pages,
            requests = pacer.requests(),
            "sync finished"
        );

        Ok(SyncReport {
            domain: self.domain.key(),
            stop_reason: stop,
            unique_records: store.len(),
            pages_fetched: pages,
            parse_misses,
        })
    }

    /// Skip the run entirely when the last full sync is inside the
    /// freshness window and a merged dataset exists.
    async fn freshness_gate(&self) -> Option<SyncReport> {
        let domain = self.domain.key();
        let last: u64 =
            cache::fetch(self.cache.as_ref(), namespaces::CACHE, &last_sync_key(domain)).await?;

        let age_ms = epoch_ms().saturating_sub(last);
        if age_ms >= self.config.freshness_window().as_millis() as u64 {
            return None;
        }

        let cached: Vec<D::Record> = cache::fetch(
            self.cache.as_ref(),
            namespaces::CACHE,
            &merged_key(domain),
        )
        .await?;

        info!(domain, age_ms, records = cached.len(), "dataset is fresh, skipping resync");
        Some(SyncReport {
            domain: self.domain.key(),
            stop_reason: StopReason::Fresh,
            unique_records: cached.len(),
            pages_fetched: 0,
            parse_misses: 0,
        })
    }

    /// Fetch and decode one page. Cursor pages go through the per-page
    /// response cache; the live page is always fetched fresh. The
    /// payload is cached only after it decodes, so a cached page never
    /// fails decoding for the same schema.
    async fn fetch_decoded(
        &self,
        before: Option<u64>,
        pacer: &mut RequestPacer,
    ) -> Result<DecodedPage<D::Record>, SourceError> {
        let domain = self.domain.key();

        if let Some(ts) = before {
            let key = page_key(domain, ts);
            if let Some(payload) =
                cache::fetch::<Value>(self.cache.as_ref(), namespaces::CACHE, &key).await
            {
                match self.domain.decode_page(&payload) {
                    Ok(page) => {
                        metrics::record_page(domain, "cache");
                        debug!(domain, before = ts, "page cache hit");
                        return Ok(page);
                    }
                    Err(err) => {
                        warn!(domain, before = ts, %err, "cached page no longer decodes, refetching");
                        let _ = self.cache.delete(namespaces::CACHE, &key).await;
                    }
                }
            }
        }

        // Pace strictly between network requests.
        if pacer.requests() > 0 {
            pacer.pause_between().await;
        }

        let query = match before {
            Some(ts) => PageQuery::before(self.domain.selection(), self.domain.category(), ts),
            None => PageQuery::live(self.domain.selection(), self.domain.category()),
        };
        let payload = match timeout(self.config.request_timeout(), self.source.fetch_page(query))
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(SourceError::Timeout),
        };
        pacer.record_request();

        let page = self.domain.decode_page(&payload)?;

        if let Some(ts) = before {
            cache::store(
                self.cache.as_ref(),
                namespaces::CACHE,
                &page_key(domain, ts),
                &payload,
                Some(self.config.page_cache_ttl()),
            )
            .await;
        }
        metrics::record_page(domain, "network");
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[test]
    fn test_key_layout() {
        assert_eq!(page_key("armory", 1_700_000_000), "armory.page.1700000000");
        assert_eq!(max_records_key("funds"), "funds.maxRecords");
    }

    #[tokio::test]
    async fn test_max_records_round_trip() {
        let cache = MemoryCache::new();
        assert_eq!(load_max_records(&cache, "armory", 1000).await, 1000);

        save_max_records(&cache, "armory", 250).await;
        assert_eq!(load_max_records(&cache, "armory", 1000).await, 250);
    }

    #[tokio::test]
    async fn test_zero_saved_cap_falls_back_to_default() {
        let cache = MemoryCache::new();
        save_max_records(&cache, "armory", 0).await;
        assert_eq!(load_max_records(&cache, "armory", 1000).await, 1000);
    }
}
