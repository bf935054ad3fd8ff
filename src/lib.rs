//! # faction-sync
//!
//! Incremental synchronization and event normalization for a faction
//! activity dashboard: organized-crime history, armory transfers, and
//! fund transfers mirrored from a rate-limited, read-only remote API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 BackfillSynchronizer (per domain)           │
//! │  • walks pages backward via a (timestamp, id) cursor        │
//! │  • dedups against a run-local seen-set                      │
//! │  • pacing: fixed inter-request delay + batch cool-down      │
//! │  • stopping: empty page / no progress / cycle / cap         │
//! └─────────────────────────────────────────────────────────────┘
//!                │                              │
//!      (log domains only)                       ▼
//!                ▼               ┌──────────────────────────────┐
//! ┌──────────────────────────┐   │   MergedStore (per domain)   │
//! │       EventParser        │   │  • id-keyed idempotent merge │
//! │  • ordered matcher list  │   │  • later snapshot overwrites │
//! │  • first match wins      │   │  • persisted after each page │
//! └──────────────────────────┘   └──────────────────────────────┘
//!                                               │
//!                                               ▼
//!                                ┌──────────────────────────────┐
//!                                │   KeyValueCache (injected)   │
//!                                │  • namespaced, optional TTL  │
//!                                │  • lazy eviction on read     │
//!                                └──────────────────────────────┘
//! ```
//!
//! Display layers read the merged dataset back from the cache and run
//! log-shaped domains through [`events::group_consecutive`] to collapse
//! adjacent same-shape events into compact rows.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use faction_sync::{
//!     BackfillSynchronizer, HttpRecordSource, HttpSourceConfig, MemoryCache,
//!     NewsDomain, SyncConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = Arc::new(
//!         HttpRecordSource::new(HttpSourceConfig {
//!             api_key: "your-key".into(),
//!             faction_id: "12345".into(),
//!             ..HttpSourceConfig::default()
//!         })
//!         .expect("client"),
//!     );
//!     let cache = Arc::new(MemoryCache::new());
//!
//!     let sync = BackfillSynchronizer::new(
//!         NewsDomain::armory(),
//!         source,
//!         cache,
//!         SyncConfig::default(),
//!     );
//!
//!     match sync.run().await {
//!         Ok(report) => println!("{} records ({})", report.unique_records, report.stop_reason),
//!         Err(err) => eprintln!("sync failed: {err}"),
//!     }
//! }
//! ```
//!
//! ## Failure policy
//!
//! Partial, valid data always beats no data. Only an authorization
//! failure ([`SyncError::Authorization`]) is fatal; transient failures
//! abort the current run with all persisted progress intact, unmatched
//! log lines are counted and dropped, and cache failures degrade to
//! misses.
//!
//! ## Modules
//!
//! - [`sync`]: the backfill engine, cursor, pacing, progress
//! - [`domains`]: per-domain strategies (crimes, armory, funds)
//! - [`events`]: typed events, the pattern parser, run grouping
//! - [`store`]: id-keyed merged datasets
//! - [`cache`]: the namespaced key-value store contract
//! - [`source`]: the remote API client and its error envelope
//! - [`metrics`]: metrics-facade instrumentation

pub mod cache;
pub mod config;
pub mod domains;
pub mod error;
pub mod events;
pub mod metrics;
pub mod source;
pub mod store;
pub mod sync;

pub use cache::{CacheEntry, CacheError, KeyValueCache, MemoryCache};
pub use config::SyncConfig;
pub use domains::{CrimeRecord, CrimesDomain, DecodedPage, NewsDomain, SyncDomain};
pub use error::SyncError;
pub use events::{
    group_consecutive, Action, EntityRef, EventParser, GroupedEvent, LogEvent, RawLogLine, Subject,
};
pub use source::{HttpRecordSource, HttpSourceConfig, PageQuery, RecordSource, SourceError};
pub use store::{MergeRecord, MergedStore};
pub use sync::{
    BackfillSynchronizer, CancelToken, StopReason, SyncCursor, SyncProgress, SyncReport,
};
