//! Run time base: anchors sensor-relative timestamps to the wall clock.

use crate::now_nanos;

/// Nanosecond origin for a run, pinned lazily on the first slice.
///
/// The sensor reports microseconds relative to its own clock start. The
/// origin anchors those to the wall clock once per run and never moves
/// afterwards, so every batch of the run shares one reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeBase {
    // 0 = not yet established
    origin_ns: u64,
}

impl TimeBase {
    pub fn new() -> Self {
        Self { origin_ns: 0 }
    }

    /// Fixed origin, for tests and replay.
    pub fn at(origin_ns: u64) -> Self {
        Self { origin_ns }
    }

    pub fn is_set(&self) -> bool {
        self.origin_ns != 0
    }

    /// Pin the origin to the current wall clock unless already set.
    pub fn establish(&mut self) -> u64 {
        if self.origin_ns == 0 {
            self.origin_ns = now_nanos();
        }
        self.origin_ns
    }

    pub fn origin_ns(&self) -> u64 {
        self.origin_ns
    }

    /// Absolute nanosecond timestamp for a sensor-relative microsecond stamp.
    #[inline]
    pub fn abs_ns(&self, t_us: u64) -> u64 {
        self.origin_ns + t_us * 1000
    }
}
