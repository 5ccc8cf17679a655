//! Node composition: camera lifecycle, delivery threading, bias setup,
//! periodic statistics.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::encode::Encoder;
use crate::error::{BridgeError, Result};
use crate::event::RawEvent;
use crate::pipeline::{EventSink, Pipeline};
use crate::sensor::{EventCamera, EventConsumer};
use crate::stats::{Counters, StatsReporter};

/// Frame id for a sensor serial: the configured value, or the serial's
/// last four characters when none is configured.
pub fn resolve_frame_id(configured: &str, serial: &str) -> String {
    if !configured.is_empty() {
        return configured.to_string();
    }
    let tail = serial.len().saturating_sub(4);
    serial[tail..].to_string()
}

/// Validate the sensor resolution against the encoding field widths.
///
/// x travels in 16 bits, which any sensor resolution fits; the compact
/// scheme carries y in 15 bits, so the height must not exceed 2^15.
pub fn validate_resolution(encoder: Encoder, width: u16, height: u16) -> Result<()> {
    if encoder == Encoder::Compact && height as u32 > 1 << 15 {
        return Err(BridgeError::Sensor(format!(
            "resolution {width}x{height} exceeds the compact encoding's 15-bit y field"
        )));
    }
    Ok(())
}

/// Forwards owned slices from the capture thread to the pipeline worker.
struct SliceForwarder {
    tx: flume::Sender<Vec<RawEvent>>,
    running: Arc<AtomicBool>,
    dropped: u64,
}

impl EventConsumer for SliceForwarder {
    fn on_events(&mut self, events: &[RawEvent]) {
        // Bounded queue: drop the slice rather than stall the capture
        // thread.
        if self.tx.try_send(events.to_vec()).is_err() {
            self.dropped += 1;
        }
    }

    fn keep_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Delegates slices to the pipeline and ticks the stats reporter.
struct ReportingConsumer<'a, S> {
    pipeline: &'a mut Pipeline<S>,
    stats: Option<&'a mut StatsReporter>,
    frame_id: &'a str,
}

impl<S: EventSink> EventConsumer for ReportingConsumer<'_, S> {
    fn on_events(&mut self, events: &[RawEvent]) {
        self.pipeline.on_events(events);
        if let Some(stats) = self.stats.as_deref_mut() {
            stats.maybe_report(self.frame_id, self.pipeline.counters());
        }
    }

    fn keep_running(&self) -> bool {
        self.pipeline.keep_running()
    }
}

/// Owns the camera driver and the pipeline for the lifetime of a run.
///
/// The camera only ever sees a borrowed [`EventConsumer`] for the duration
/// of [`EventCamera::run`]; ownership of both halves stays here.
pub struct BridgeNode<S> {
    camera: Box<dyn EventCamera>,
    pipeline: Pipeline<S>,
    frame_id: String,
    use_multithreading: bool,
    send_queue_depth: usize,
    stats: Option<StatsReporter>,
}

impl<S: EventSink> BridgeNode<S> {
    pub fn new(
        camera: Box<dyn EventCamera>,
        pipeline: Pipeline<S>,
        frame_id: String,
        config: &Config,
    ) -> Self {
        let stats = (config.statistics_print_interval_secs > 0).then(|| {
            StatsReporter::new(Duration::from_secs(config.statistics_print_interval_secs))
        });
        Self {
            camera,
            pipeline,
            frame_id,
            use_multithreading: config.use_multithreading,
            send_queue_depth: config.send_queue_depth,
            stats,
        }
    }

    pub fn counters(&self) -> &Arc<Counters> {
        self.pipeline.counters()
    }

    /// Shared flag the run polls; store false to stop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.pipeline.running_flag()
    }

    /// Current value of a named sensor bias (pass-through).
    pub fn bias(&self, name: &str) -> Result<i32> {
        self.camera.bias(name)
    }

    /// Set a named sensor bias; returns the device's read-back value.
    pub fn set_bias(&mut self, name: &str, value: i32) -> Result<i32> {
        self.camera.set_bias(name, value)
    }

    /// Apply a bias file to the camera: one `<value> % <name>` line per
    /// bias; `#` lines and blanks are skipped.
    pub fn apply_bias_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::BiasFile(format!("{}: {e}", path.display())))?;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (value, name) = line
                .split_once('%')
                .ok_or_else(|| BridgeError::BiasFile(format!("malformed line '{line}'")))?;
            let value: i32 = value
                .trim()
                .parse()
                .map_err(|_| BridgeError::BiasFile(format!("malformed value in '{line}'")))?;
            let name = name.trim();
            let applied = self.camera.set_bias(name, value)?;
            if applied == value {
                log::info!("Bias '{name}' set to {applied}");
            } else {
                log::warn!("Bias '{name}' clamped to {applied} (requested {value})");
            }
        }
        Ok(())
    }

    /// Drive the camera until the running flag clears, then release it.
    pub fn run(&mut self) -> Result<()> {
        log::info!("Using frame id: {}", self.frame_id);
        let result = if self.use_multithreading {
            self.run_threaded()
        } else {
            let mut consumer = ReportingConsumer {
                pipeline: &mut self.pipeline,
                stats: self.stats.as_mut(),
                frame_id: &self.frame_id,
            };
            self.camera.run(&mut consumer)
        };
        self.camera.stop()?;
        result
    }

    /// Capture thread feeds a bounded queue; this thread drains it into
    /// the pipeline, preserving the one-delivery-in-flight contract.
    fn run_threaded(&mut self) -> Result<()> {
        let (tx, rx) = flume::bounded::<Vec<RawEvent>>(self.send_queue_depth);
        let running = self.pipeline.running_flag();
        let camera = &mut self.camera;
        let pipeline = &mut self.pipeline;
        let stats = self.stats.as_mut();
        let frame_id = self.frame_id.as_str();

        std::thread::scope(|scope| {
            let capture = scope.spawn(move || {
                let mut forwarder = SliceForwarder {
                    tx,
                    running,
                    dropped: 0,
                };
                let result = camera.run(&mut forwarder);
                if forwarder.dropped > 0 {
                    log::warn!("{} slices dropped on a full send queue", forwarder.dropped);
                }
                result
            });

            let mut consumer = ReportingConsumer {
                pipeline,
                stats,
                frame_id,
            };
            // Ends when the capture side drops its sender.
            while let Ok(slice) = rx.recv() {
                consumer.on_events(&slice);
            }

            capture
                .join()
                .map_err(|_| BridgeError::Sensor("capture thread panicked".into()))?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_from_serial_tail() {
        assert_eq!(resolve_frame_id("", "00001508"), "1508");
        assert_eq!(resolve_frame_id("", "42"), "42");
        assert_eq!(resolve_frame_id("lab0", "00001508"), "lab0");
    }

    #[test]
    fn test_resolution_fits_compact_fields() {
        assert!(validate_resolution(Encoder::Compact, 1280, 720).is_ok());
        assert!(validate_resolution(Encoder::Compact, 640, 32768).is_ok());
        assert!(validate_resolution(Encoder::Compact, 640, 32769).is_err());
        // Verbose carries full-width coordinates.
        assert!(validate_resolution(Encoder::Verbose, 65535, 65535).is_ok());
    }
}
