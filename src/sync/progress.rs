//! Run progress, outcome reporting, and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Snapshot of an in-progress run, broadcast after every page so display
/// layers can observe a sync they did not start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncProgress {
    /// Records fetched so far, duplicates included.
    pub fetched: usize,
    /// Unique records accumulated.
    pub unique: usize,
    /// The run's record cap.
    pub target: usize,
    /// Requests issued.
    pub requests: u32,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The remote returned an empty page: history exhausted.
    Exhausted,
    /// A page contained zero unseen ids.
    NoForwardProgress,
    /// The server returned the same edge page twice.
    CursorCycle,
    /// The unique-record cap was reached.
    MaxRecords,
    /// The last full sync is inside the freshness window; nothing was
    /// fetched.
    Fresh,
    /// The caller cancelled the run at a checkpoint.
    Cancelled,
}

impl StopReason {
    /// Whether this outcome counts as a successful full sync (and should
    /// refresh the freshness timestamp).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::Fresh)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::NoForwardProgress => "no_forward_progress",
            Self::CursorCycle => "cursor_cycle",
            Self::MaxRecords => "max_records",
            Self::Fresh => "fresh",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one synchronizer run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub domain: &'static str,
    pub stop_reason: StopReason,
    /// Unique records in the merged dataset after the run.
    pub unique_records: usize,
    pub pages_fetched: u32,
    /// Lines dropped because no pattern recognized them.
    pub parse_misses: usize,
}

/// Cooperative cancellation flag, checked at each loop-top checkpoint.
/// There is no preemptive interruption mid-request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
