//! Sync domains.
//!
//! One backfill engine serves three activity domains. A [`SyncDomain`]
//! carries everything domain-specific: the cache key, the remote
//! selection and category, and how a raw page payload becomes typed
//! records. The engine itself never looks inside a record beyond the
//! [`MergeRecord`] seam.

pub mod crimes;
pub mod news;

pub use crimes::{CrimeRecord, CrimesDomain};
pub use news::NewsDomain;

use serde_json::Value;

use crate::source::SourceError;
use crate::store::MergeRecord;

/// A decoded page: the typed records plus how many entries were dropped
/// because no pattern (or schema) recognized them.
#[derive(Debug, Clone)]
pub struct DecodedPage<R> {
    pub records: Vec<R>,
    pub parse_misses: usize,
}

impl<R> DecodedPage<R> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            parse_misses: 0,
        }
    }
}

/// Domain-specific strategy consumed by the backfill synchronizer.
pub trait SyncDomain: Send + Sync {
    type Record: MergeRecord;

    /// Stable key used for cache entries (`<key>.merged`, `<key>.lastSync`,
    /// `<key>.page.<cursor>`).
    fn key(&self) -> &'static str;

    /// Remote selection name.
    fn selection(&self) -> &'static str;

    /// Optional remote category filter.
    fn category(&self) -> Option<&'static str> {
        None
    }

    /// Decode one raw page payload. Unrecognized entries are counted,
    /// not fatal; an undecodable payload as a whole is a transient
    /// source error.
    fn decode_page(&self, payload: &Value) -> Result<DecodedPage<Self::Record>, SourceError>;
}
