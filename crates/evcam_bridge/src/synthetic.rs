//! Deterministic event source for tests, benches and hardware-free runs.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::SensorConfig;
use crate::error::{BridgeError, Result};
use crate::event::RawEvent;
use crate::sensor::{EventCamera, EventConsumer};

/// Biases a real sensor exposes; the synthetic camera accepts the same
/// names so pass-through plumbing can be exercised without hardware.
const BIAS_NAMES: [&str; 7] = [
    "bias_diff",
    "bias_diff_off",
    "bias_diff_on",
    "bias_fo",
    "bias_hpf",
    "bias_pr",
    "bias_refr",
];

/// Generates a diagonal sweep of alternating-polarity events.
///
/// Each slice covers `slice_interval` of sensor time with evenly spaced
/// timestamps, so slices arrive monotonic within and across calls.
pub struct SyntheticCamera {
    serial: String,
    width: u16,
    height: u16,
    events_per_slice: usize,
    slice_interval: Duration,
    /// Stop after this many slices; None runs until the consumer stops.
    max_slices: Option<u64>,
    biases: HashMap<String, i32>,
    t_us: u64,
    cursor: u64,
}

impl SyntheticCamera {
    pub fn new(
        serial: impl Into<String>,
        width: u16,
        height: u16,
        events_per_slice: usize,
        slice_interval: Duration,
    ) -> Self {
        Self {
            serial: serial.into(),
            width: width.max(1),
            height: height.max(1),
            events_per_slice: events_per_slice.max(1),
            slice_interval,
            max_slices: None,
            biases: BIAS_NAMES.iter().map(|name| (name.to_string(), 0)).collect(),
            t_us: 0,
            cursor: 0,
        }
    }

    pub fn from_config(config: &SensorConfig) -> Self {
        Self::new(
            config.serial.clone(),
            config.width,
            config.height,
            config.events_per_slice,
            Duration::from_micros(config.slice_interval_us),
        )
    }

    /// Bound the run to `n` slices (tests and benches).
    pub fn with_max_slices(mut self, n: u64) -> Self {
        self.max_slices = Some(n);
        self
    }

    fn next_slice(&mut self, out: &mut Vec<RawEvent>) {
        out.clear();
        let span_us = (self.slice_interval.as_micros() as u64).max(1);
        let n = self.events_per_slice as u64;
        for i in 0..n {
            out.push(RawEvent {
                x: (self.cursor % self.width as u64) as u16,
                y: (self.cursor % self.height as u64) as u16,
                polarity: self.cursor % 2 == 0,
                t: self.t_us + i * span_us / n,
            });
            self.cursor = self.cursor.wrapping_add(1);
        }
        self.t_us += span_us;
    }
}

impl EventCamera for SyntheticCamera {
    fn serial(&self) -> String {
        self.serial.clone()
    }

    fn resolution(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn bias(&self, name: &str) -> Result<i32> {
        self.biases
            .get(name)
            .copied()
            .ok_or_else(|| BridgeError::UnknownBias(name.into()))
    }

    fn set_bias(&mut self, name: &str, value: i32) -> Result<i32> {
        match self.biases.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(*slot)
            }
            None => Err(BridgeError::UnknownBias(name.into())),
        }
    }

    fn run(&mut self, consumer: &mut dyn EventConsumer) -> Result<()> {
        let mut slice = Vec::with_capacity(self.events_per_slice);
        let mut delivered = 0u64;
        while consumer.keep_running() {
            if let Some(max) = self.max_slices {
                if delivered >= max {
                    break;
                }
            }
            self.next_slice(&mut slice);
            consumer.on_events(&slice);
            delivered += 1;
            if !self.slice_interval.is_zero() {
                std::thread::sleep(self.slice_interval);
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collector {
        slices: Vec<Vec<RawEvent>>,
    }

    impl EventConsumer for Collector {
        fn on_events(&mut self, events: &[RawEvent]) {
            self.slices.push(events.to_vec());
        }

        fn keep_running(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_slices_are_monotonic() {
        let mut camera =
            SyntheticCamera::new("00000042", 640, 480, 64, Duration::from_micros(200))
                .with_max_slices(3);
        let mut collector = Collector { slices: Vec::new() };
        camera.run(&mut collector).unwrap();
        assert_eq!(collector.slices.len(), 3);

        let mut last = 0u64;
        for slice in &collector.slices {
            assert_eq!(slice.len(), 64);
            for event in slice {
                assert!(event.t >= last);
                last = event.t;
                assert!(event.x < 640);
                assert!(event.y < 480);
            }
        }
    }

    #[test]
    fn test_polarity_alternates() {
        let mut camera =
            SyntheticCamera::new("00000042", 32, 32, 10, Duration::from_micros(100))
                .with_max_slices(1);
        let mut collector = Collector { slices: Vec::new() };
        camera.run(&mut collector).unwrap();
        let slice = &collector.slices[0];
        let on = slice.iter().filter(|e| e.polarity).count();
        assert_eq!(on, 5);
    }

    #[test]
    fn test_bias_roundtrip() {
        let mut camera = SyntheticCamera::new("00000042", 640, 480, 1, Duration::ZERO);
        assert_eq!(camera.bias("bias_diff").unwrap(), 0);
        assert_eq!(camera.set_bias("bias_diff", 299).unwrap(), 299);
        assert_eq!(camera.bias("bias_diff").unwrap(), 299);
    }

    #[test]
    fn test_unknown_bias_is_rejected() {
        let mut camera = SyntheticCamera::new("00000042", 640, 480, 1, Duration::ZERO);
        assert!(camera.bias("bias_bogus").is_err());
        assert!(camera.set_bias("bias_bogus", 1).is_err());
    }

    #[test]
    fn test_consumer_stops_the_run() {
        struct StopAfterOne {
            seen: usize,
        }
        impl EventConsumer for StopAfterOne {
            fn on_events(&mut self, _events: &[RawEvent]) {
                self.seen += 1;
            }
            fn keep_running(&self) -> bool {
                self.seen == 0
            }
        }
        let mut camera = SyntheticCamera::new("00000042", 640, 480, 8, Duration::ZERO);
        let mut consumer = StopAfterOne { seen: 0 };
        camera.run(&mut consumer).unwrap();
        assert_eq!(consumer.seen, 1);
    }
}
