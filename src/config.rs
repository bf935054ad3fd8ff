//! Configuration for the backfill engine.
//!
//! # Example
//!
//! ```
//! use faction_sync::SyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfig::default();
//! assert_eq!(config.max_records, 1000);
//! assert_eq!(config.requests_per_batch, 30);
//!
//! // Partial config deserializes into a fully valid one
//! let config: SyncConfig = serde_json::from_str(r#"{"max_records": 250}"#).unwrap();
//! assert_eq!(config.max_records, 250);
//! assert_eq!(config.request_delay_ms, 2500);
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Pacing, capping and freshness knobs for one synchronizer.
///
/// All fields have defaults tuned to the remote's sustained-rate limits
/// (roughly one request per 2.5 seconds, with a long pause after every
/// block of 30).
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Cap on unique records kept per domain (user-adjustable).
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Fixed delay between consecutive page requests.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Requests between sustained-rate pauses.
    #[serde(default = "default_requests_per_batch")]
    pub requests_per_batch: u32,

    /// Sustained-rate pause after each block of requests.
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Skip a resync entirely when the last full sync is younger than
    /// this.
    #[serde(default = "default_freshness_window_secs")]
    pub freshness_window_secs: u64,

    /// TTL for cached per-page responses.
    #[serde(default = "default_page_cache_ttl_secs")]
    pub page_cache_ttl_secs: u64,

    /// Hard bound on each network call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_records() -> usize {
    1000
}
fn default_request_delay_ms() -> u64 {
    2500
}
fn default_requests_per_batch() -> u32 {
    30
}
fn default_batch_pause_ms() -> u64 {
    60_000
}
fn default_freshness_window_secs() -> u64 {
    3600
}
fn default_page_cache_ttl_secs() -> u64 {
    7 * 24 * 3600
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            request_delay_ms: default_request_delay_ms(),
            requests_per_batch: default_requests_per_batch(),
            batch_pause_ms: default_batch_pause_ms(),
            freshness_window_secs: default_freshness_window_secs(),
            page_cache_ttl_secs: default_page_cache_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    #[must_use]
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    #[must_use]
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    #[must_use]
    pub fn page_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.page_cache_ttl_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
