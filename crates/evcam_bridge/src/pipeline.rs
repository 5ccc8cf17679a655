//! Slice-to-batch pipeline.
//!
//! Receives raw event slices from the sensor boundary, drives encoder,
//! accumulator and flush policy in sequence, and hands closed batches to
//! the transport sink together with updated counters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::batch::{Batch, BatchAccumulator, BatchParams};
use crate::encode::Encoder;
use crate::error::Result;
use crate::event::RawEvent;
use crate::flush::FlushPolicy;
use crate::now_nanos;
use crate::sensor::EventConsumer;
use crate::stats::Counters;
use crate::time_base::TimeBase;

/// Transport boundary receiving finished batches.
pub trait EventSink {
    /// Whether anyone is listening. Slices are discarded unencoded while
    /// this is false.
    fn has_subscribers(&self) -> bool;

    /// Hand off one finished batch.
    fn publish(&mut self, batch: Batch) -> Result<()>;
}

/// Drives encoding and batching for each inbound slice.
///
/// Not internally synchronized: the sensor driver guarantees one slice
/// delivery in flight at a time. Deployments that deliver from several
/// threads must wrap one pipeline instance in their own mutual exclusion.
pub struct Pipeline<S> {
    sink: S,
    encoder: Encoder,
    accumulator: BatchAccumulator,
    policy: FlushPolicy,
    time_base: TimeBase,
    counters: Arc<Counters>,
    running: Arc<AtomicBool>,
}

impl<S: EventSink> Pipeline<S> {
    pub fn new(sink: S, params: BatchParams, policy: FlushPolicy) -> Self {
        let encoder = params.encoder;
        Self {
            sink,
            encoder,
            accumulator: BatchAccumulator::new(params),
            policy,
            time_base: TimeBase::new(),
            counters: Arc::new(Counters::new()),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Replace the lazily established time base, for replay and tests.
    pub fn with_time_base(mut self, time_base: TimeBase) -> Self {
        self.time_base = time_base;
        self
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    /// Shared flag polled by `keep_running`; store false to stop the run.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn time_base(&self) -> &TimeBase {
        &self.time_base
    }

    /// Process one slice of events with non-decreasing timestamps.
    ///
    /// Returns whether a batch was flushed. Encoding is skipped entirely
    /// while the sink has no subscribers, but the time base is still
    /// established so later batches stay on the run's clock.
    pub fn process_slice(&mut self, events: &[RawEvent]) -> Result<bool> {
        self.time_base.establish();
        if events.is_empty() || !self.sink.has_subscribers() {
            return Ok(false);
        }

        let first_ns = self.time_base.abs_ns(events[0].t);
        let encoder = self.encoder;
        let batch = self.accumulator.ensure_open(first_ns);

        // Hot path: every push lands in pre-reserved storage.
        let mut count = [0u64; 2];
        for event in events {
            encoder.encode_into(batch, event, &self.time_base);
            count[event.polarity as usize] += 1;
        }
        self.counters.add_events(count[0], count[1]);

        let newest_ns = self.time_base.abs_ns(events[events.len() - 1].t);
        if !self.policy.should_flush(batch, newest_ns) {
            return Ok(false);
        }

        let mut batch = self.accumulator.close();
        batch.set_pub_time(now_nanos());
        let published = batch.len() as u64;
        self.sink.publish(batch)?;
        self.counters.add_published(published);
        Ok(true)
    }
}

impl<S: EventSink> EventConsumer for Pipeline<S> {
    fn on_events(&mut self, events: &[RawEvent]) {
        // Collaborator failures surface here; the core does not retry.
        if let Err(e) = self.process_slice(events) {
            log::error!("slice processing failed: {e}");
        }
    }

    fn keep_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
