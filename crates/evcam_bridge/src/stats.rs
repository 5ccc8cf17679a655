//! Run counters and periodic statistics reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic run counters, shared between the pipeline and reporters.
///
/// Increments use relaxed ordering: reporting legitimately races with
/// encoding and only needs eventually-consistent values.
#[derive(Debug, Default)]
pub struct Counters {
    events_off: AtomicU64,
    events_on: AtomicU64,
    events_sent: AtomicU64,
    msgs_sent: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record encoded events per polarity (OFF, ON).
    pub fn add_events(&self, off: u64, on: u64) {
        self.events_off.fetch_add(off, Ordering::Relaxed);
        self.events_on.fetch_add(on, Ordering::Relaxed);
    }

    /// Record one published batch carrying `events` events.
    pub fn add_published(&self, events: u64) {
        self.events_sent.fetch_add(events, Ordering::Relaxed);
        self.msgs_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            events_off: self.events_off.load(Ordering::Relaxed),
            events_on: self.events_on.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
            msgs_sent: self.msgs_sent.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub events_off: u64,
    pub events_on: u64,
    pub events_sent: u64,
    pub msgs_sent: u64,
}

impl CounterSnapshot {
    pub fn events_total(&self) -> u64 {
        self.events_off + self.events_on
    }
}

/// Logs event and message rates at a fixed interval.
pub struct StatsReporter {
    interval: Duration,
    last_log: Instant,
    last: CounterSnapshot,
}

impl StatsReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_log: Instant::now(),
            last: CounterSnapshot::default(),
        }
    }

    /// Emit a rate line if the interval has elapsed since the last one.
    pub fn maybe_report(&mut self, frame_id: &str, counters: &Counters) {
        let elapsed = self.last_log.elapsed();
        if elapsed < self.interval {
            return;
        }
        let snap = counters.snapshot();
        let secs = elapsed.as_secs_f64();
        let events = snap.events_total() - self.last.events_total();
        let msgs = snap.msgs_sent - self.last.msgs_sent;
        log::info!(
            "[{frame_id}] {:.3} Mev/s, {:.1} msgs/s ({} events, {} msgs sent total)",
            events as f64 / secs / 1e6,
            msgs as f64 / secs,
            snap.events_sent,
            snap.msgs_sent
        );
        self.last = snap;
        self.last_log = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate_per_polarity() {
        let counters = Counters::new();
        counters.add_events(3, 5);
        counters.add_events(2, 0);
        let snap = counters.snapshot();
        assert_eq!(snap.events_off, 5);
        assert_eq!(snap.events_on, 5);
        assert_eq!(snap.events_total(), 10);
    }

    #[test]
    fn test_published_tracks_events_and_messages() {
        let counters = Counters::new();
        counters.add_published(320);
        counters.add_published(17);
        let snap = counters.snapshot();
        assert_eq!(snap.events_sent, 337);
        assert_eq!(snap.msgs_sent, 2);
    }

    #[test]
    fn test_snapshot_is_stable_copy() {
        let counters = Counters::new();
        counters.add_events(1, 1);
        let before = counters.snapshot();
        counters.add_events(1, 1);
        assert_eq!(before.events_total(), 2);
        assert_eq!(counters.snapshot().events_total(), 4);
    }
}
