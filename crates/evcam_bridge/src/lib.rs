//! Event camera bridge: batches high-rate sensor events into bounded
//! protobuf messages published over Zenoh.
//!
//! An event-based vision sensor reports per-pixel polarity changes at rates
//! that can exceed 10^5 events per delivered slice. The bridge accumulates
//! each slice into the open batch, closes the batch once it spans a
//! configurable time threshold, and hands it to the transport.
//!
//! # Data flow
//!
//! ```text
//! sensor driver ──► Pipeline ──► Encoder ──► open Batch ──► FlushPolicy
//!  (RawEvent          │      verbose/compact     │              │ stamp + threshold
//!   slices)           │                          │ reserved     ▼
//!                     └── counters               └────► EventSink ──► Zenoh
//! ```
//!
//! # Modules
//!
//! - [`config`] — YAML configuration with load-time validation.
//! - [`event`] — raw sensor event type.
//! - [`time_base`] — run origin and absolute timestamp conversion.
//! - [`protocol`] — protobuf wire messages.
//! - [`encode`] — per-event encoders and the compact bit packing.
//! - [`batch`] — in-flight batch ownership and lifecycle.
//! - [`flush`] — time-threshold flush decision.
//! - [`pipeline`] — slice processing and the transport boundary.
//! - [`stats`] — run counters and periodic reporting.
//! - [`sensor`] — driver traits at the SDK boundary.
//! - [`synthetic`] — deterministic hardware-free source.
//! - [`transport`] — Zenoh sink.
//! - [`node`] — composition root and delivery threading.

pub mod batch;
pub mod config;
pub mod encode;
pub mod error;
pub mod event;
pub mod flush;
pub mod node;
pub mod pipeline;
pub mod protocol;
pub mod sensor;
pub mod stats;
pub mod synthetic;
pub mod time_base;
pub mod transport;

pub use error::{BridgeError, Result};

/// Current wall-clock time in nanoseconds since Unix epoch.
pub(crate) fn now_nanos() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
