//! Time-threshold flush decision.

use std::time::Duration;

use crate::batch::Batch;

/// Closes a batch once it spans the configured time threshold.
#[derive(Debug, Clone, Copy)]
pub struct FlushPolicy {
    threshold_ns: u64,
}

impl FlushPolicy {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold_ns: threshold.as_nanos() as u64,
        }
    }

    pub fn threshold_ns(&self) -> u64 {
        self.threshold_ns
    }

    /// True once `newest_ns` reaches the batch stamp plus the threshold.
    ///
    /// The decision runs in the same call that appended the newest event,
    /// so the triggering event is part of the batch being flushed. A
    /// threshold at or below the per-slice jitter of the driver degenerates
    /// to one batch per slice, which is legitimate tuning.
    pub fn should_flush(&self, batch: &Batch, newest_ns: u64) -> bool {
        newest_ns >= batch.stamp_ns() + self.threshold_ns
    }
}
