//! Wire messages published by the bridge.
//!
//! Messages follow the Header-at-field-1 convention so downstream tooling
//! can extract batch metadata without knowing the concrete message type.

/// Batch metadata, field 1 of every published message.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Header {
    /// Source identifier, stamped on every batch of a run.
    #[prost(string, tag = "1")]
    pub frame_id: String,
    /// Monotonic batch sequence number.
    #[prost(uint64, tag = "2")]
    pub sequence: u64,
    /// Absolute timestamp of the first event in the batch, nanoseconds.
    #[prost(fixed64, tag = "3")]
    pub stamp: u64,
    /// Wall clock at publish time, nanoseconds.
    #[prost(fixed64, tag = "4")]
    pub pub_time: u64,
}

/// Self-contained per-event record (verbose encoding).
#[derive(Clone, PartialEq, prost::Message)]
pub struct EventRecord {
    #[prost(uint32, tag = "1")]
    pub x: u32,
    #[prost(uint32, tag = "2")]
    pub y: u32,
    #[prost(bool, tag = "3")]
    pub polarity: bool,
    /// Absolute timestamp, nanoseconds.
    #[prost(fixed64, tag = "4")]
    pub ts: u64,
}

/// Verbose batch: one record per event.
#[derive(Clone, PartialEq, prost::Message)]
pub struct EventArray {
    #[prost(message, optional, tag = "1")]
    pub header: Option<Header>,
    #[prost(uint32, tag = "2")]
    pub width: u32,
    #[prost(uint32, tag = "3")]
    pub height: u32,
    #[prost(message, repeated, tag = "4")]
    pub events: Vec<EventRecord>,
}

/// Compact batch: one little-endian 64-bit word per event.
///
/// Word layout: bit 63 polarity, bits 62..48 y, bits 47..32 x,
/// bits 31..0 dt relative to [`EventPacket::time_base`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct EventPacket {
    #[prost(message, optional, tag = "1")]
    pub header: Option<Header>,
    #[prost(uint32, tag = "2")]
    pub width: u32,
    #[prost(uint32, tag = "3")]
    pub height: u32,
    /// Absolute nanosecond timestamp the per-event `dt` fields are
    /// relative to: the first event of the batch.
    #[prost(fixed64, tag = "4")]
    pub time_base: u64,
    #[prost(fixed64, repeated, tag = "5")]
    pub events: Vec<u64>,
}

/// Topic a camera's batches are published on.
pub fn events_topic(frame_id: &str) -> String {
    format!("/camera/{frame_id}/events")
}
