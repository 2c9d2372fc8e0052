//! Sync policy.

use std::time::Duration;

/// Tunable sync policy. None of these values affect what gets indexed,
/// only when it is committed and how often the feed is polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Commit once the batch holds more than this many writes.
    pub max_batch_entries: usize,
    /// Commit after every height once the tip is closer than this.
    pub near_tip_window: u64,
    /// Sleep between tip checks while caught up.
    pub poll_interval: Duration,
    /// Sleep before retrying an unreachable feed.
    pub retry_delay: Duration,
    /// Log catch-up progress every this many heights; 0 disables it.
    pub progress_interval: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            max_batch_entries: 1000,
            near_tip_window: 10,
            poll_interval: Duration::from_secs(10),
            retry_delay: Duration::from_secs(30),
            progress_interval: 5000,
        }
    }
}

impl SyncOptions {
    /// Whether the batch should be committed after ingesting `height`.
    pub fn should_flush(&self, batch_len: usize, height: u64, tip: u64) -> bool {
        batch_len > self.max_batch_entries || tip.saturating_sub(height) < self.near_tip_window
    }
}
