// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Request pacing.
//!
//! The remote tolerates roughly one request every 2-2.5 seconds, plus a
//! longer cool-down after each sustained block. The pacer owns both
//! delays; the synchronizer awaits it between requests so the pauses
//! land at well-defined checkpoints.

use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

pub struct RequestPacer {
    delay: Duration,
    requests_per_batch: u32,
    batch_pause: Duration,
    sent: u32,
}

impl RequestPacer {
    #[must_use]
    pub fn new(delay: Duration, requests_per_batch: u32, batch_pause: Duration) -> Self {
        Self {
            delay,
            requests_per_batch: requests_per_batch.max(1),
            batch_pause,
            sent: 0,
        }
    }

    /// Count one issued request.
    pub fn record_request(&mut self) {
        self.sent += 1;
    }

    /// Requests issued so far this run.
    #[must_use]
    pub fn requests(&self) -> u32 {
        self.sent
    }

    /// Whether the next pause will include the long batch cool-down.
    #[must_use]
    pub fn batch_boundary(&self) -> bool {
        self.sent > 0 && self.sent % self.requests_per_batch == 0
    }

    /// Suspend between requests: the fixed inter-request delay, plus the
    /// batch pause when a block of requests just completed.
    pub async fn pause_between(&self) {
        sleep(self.delay).await;
        if self.batch_boundary() {
            info!(
                requests = self.sent,
                pause_secs = self.batch_pause.as_secs(),
                "sustained-rate pause"
            );
            sleep(self.batch_pause).await;
        }
    }
}
