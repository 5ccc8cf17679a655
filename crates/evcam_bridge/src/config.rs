use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::encode::Encoder;

/// Wire encoding selection for published batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Self-contained record per event (larger, no decoder needed).
    Verbose,
    /// Bit-packed 64-bit word per event.
    #[default]
    Compact,
}

impl From<Encoding> for Encoder {
    fn from(config: Encoding) -> Self {
        match config {
            Encoding::Verbose => Encoder::Verbose,
            Encoding::Compact => Encoder::Compact,
        }
    }
}

/// Parameters of the built-in synthetic source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Device serial reported by the source.
    #[serde(default = "default_serial")]
    pub serial: String,
    #[serde(default = "default_width")]
    pub width: u16,
    #[serde(default = "default_height")]
    pub height: u16,
    /// Events generated per delivered slice.
    #[serde(default = "default_events_per_slice")]
    pub events_per_slice: usize,
    /// Sensor time covered by one slice, microseconds.
    #[serde(default = "default_slice_interval_us")]
    pub slice_interval_us: u64,
}

fn default_serial() -> String {
    "00000042".into()
}

fn default_width() -> u16 {
    640
}

fn default_height() -> u16 {
    480
}

fn default_events_per_slice() -> usize {
    // Full-load packet size delivered per callback by the SilkyEvCam SDK.
    320
}

fn default_slice_interval_us() -> u64 {
    1000
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            serial: default_serial(),
            width: default_width(),
            height: default_height(),
            events_per_slice: default_events_per_slice(),
            slice_interval_us: default_slice_interval_us(),
        }
    }
}

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Frame id stamped on every batch; derived from the last four
    /// characters of the sensor serial when empty.
    #[serde(default)]
    pub frame_id: String,

    /// Wire encoding for published batches.
    #[serde(default)]
    pub encoding: Encoding,

    /// Batch time span that triggers a flush, microseconds.
    #[serde(default = "default_message_time_threshold_us")]
    pub message_time_threshold_us: u64,

    /// Expected peak event rate, used only to size per-batch
    /// pre-reservation.
    #[serde(default = "default_sensors_max_events_per_second")]
    pub sensors_max_events_per_second: f64,

    /// Capacity of the slice queue in multithreaded delivery mode.
    #[serde(default = "default_send_queue_depth")]
    pub send_queue_depth: usize,

    /// Deliver slices to the pipeline from a dedicated worker thread
    /// instead of the capture thread.
    #[serde(default)]
    pub use_multithreading: bool,

    /// Seconds between statistics log lines; 0 disables reporting.
    #[serde(default = "default_statistics_print_interval_secs")]
    pub statistics_print_interval_secs: u64,

    /// Bias settings applied to the sensor at startup.
    #[serde(default)]
    pub bias_file: Option<PathBuf>,

    /// Built-in synthetic source parameters.
    #[serde(default)]
    pub sensor: SensorConfig,
}

fn default_message_time_threshold_us() -> u64 {
    100
}

fn default_sensors_max_events_per_second() -> f64 {
    50e6
}

fn default_send_queue_depth() -> usize {
    1000
}

fn default_statistics_print_interval_secs() -> u64 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_id: String::new(),
            encoding: Encoding::default(),
            message_time_threshold_us: default_message_time_threshold_us(),
            sensors_max_events_per_second: default_sensors_max_events_per_second(),
            send_queue_depth: default_send_queue_depth(),
            use_multithreading: false,
            statistics_print_interval_secs: default_statistics_print_interval_secs(),
            bias_file: None,
            sensor: SensorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Flush threshold as a duration.
    pub fn message_time_threshold(&self) -> Duration {
        Duration::from_micros(self.message_time_threshold_us)
    }

    /// Events to pre-reserve per batch: expected peak rate times the flush
    /// threshold.
    pub fn reserve_size(&self) -> usize {
        (self.sensors_max_events_per_second * self.message_time_threshold_us as f64 / 1e6) as usize
    }

    /// Reject degenerate settings before the node starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.message_time_threshold_us == 0 {
            return Err(ConfigError::ValidationError(
                "message_time_threshold_us must be positive".into(),
            ));
        }
        if !(self.sensors_max_events_per_second > 0.0) {
            return Err(ConfigError::ValidationError(
                "sensors_max_events_per_second must be positive".into(),
            ));
        }
        if self.reserve_size() == 0 {
            return Err(ConfigError::ValidationError(
                "batch pre-reservation is zero; raise sensors_max_events_per_second or \
                 message_time_threshold_us"
                    .into(),
            ));
        }
        if self.send_queue_depth == 0 {
            return Err(ConfigError::ValidationError(
                "send_queue_depth must be positive".into(),
            ));
        }
        if self.sensor.width == 0 || self.sensor.height == 0 {
            return Err(ConfigError::ValidationError(
                "sensor resolution must be positive".into(),
            ));
        }
        if self.sensor.events_per_slice == 0 {
            return Err(ConfigError::ValidationError(
                "sensor.events_per_slice must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
