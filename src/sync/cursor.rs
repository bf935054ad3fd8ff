//! Backfill cursor.

use serde::{Deserialize, Serialize};

use crate::store::MergeRecord;

/// Position of a backfill run: the oldest `(timestamp, id)` pair seen in
/// the current batch. Recomputed each iteration; owned exclusively by
/// the synchronizer for the lifetime of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    /// Epoch seconds of the oldest record in the batch.
    pub oldest_timestamp: u64,
    /// Id of that record, used for cycle detection.
    pub oldest_id: String,
}

impl SyncCursor {
    /// Extract the cursor from a batch. Ties on timestamp break toward
    /// the smaller id so the cursor is deterministic.
    pub fn from_records<R: MergeRecord>(records: &[R]) -> Option<Self> {
        records
            .iter()
            .min_by(|a, b| {
                a.timestamp()
                    .cmp(&b.timestamp())
                    .then_with(|| a.record_id().cmp(&b.record_id()))
            })
            .map(|oldest| Self {
                oldest_timestamp: oldest.timestamp(),
                oldest_id: oldest.record_id(),
            })
    }
}
