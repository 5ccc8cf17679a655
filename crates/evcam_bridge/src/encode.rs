//! Per-event wire encoding.

use crate::batch::Batch;
use crate::event::RawEvent;
use crate::protocol::EventRecord;
use crate::time_base::TimeBase;

/// Mask applied to the compact relative timestamp.
///
/// Deltas wrap modulo 2^32, about 4.29 s at nanosecond resolution. The
/// flush threshold keeps batch spans orders of magnitude below that bound,
/// so the wrap is a documented limit rather than an error path.
const DT_MASK: u64 = 0xFFFF_FFFF;

/// Pack one event into the 64-bit compact word:
/// bit 63 polarity, bits 62..48 y, bits 47..32 x, bits 31..0 dt.
#[inline]
pub fn pack_event(polarity: bool, x: u16, y: u16, dt: u32) -> u64 {
    debug_assert!(y < (1 << 15), "y {y} exceeds the 15-bit field");
    (polarity as u64) << 63 | (y as u64) << 48 | (x as u64) << 32 | dt as u64
}

/// Recover `(polarity, y, x, dt)` from a compact word.
#[inline]
pub fn unpack_event(word: u64) -> (bool, u16, u16, u32) {
    (
        word >> 63 != 0,
        ((word >> 48) & 0x7FFF) as u16,
        ((word >> 32) & 0xFFFF) as u16,
        (word & DT_MASK) as u32,
    )
}

/// Per-event encoding scheme, selected once at pipeline construction.
///
/// Coordinate field widths (16-bit x, 15-bit y for the compact scheme) are
/// validated against the sensor resolution at startup, never per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    /// Self-contained record per event with an absolute timestamp.
    Verbose,
    /// One bit-packed 64-bit word per event, timestamp relative to the
    /// batch time base.
    Compact,
}

impl Encoder {
    /// Append one event to the open batch.
    ///
    /// The batch must have been opened for this encoder's scheme, and
    /// events must arrive with non-decreasing timestamps: a compact `dt`
    /// is never computed against a timestamp earlier than the batch time
    /// base.
    pub fn encode_into(&self, batch: &mut Batch, event: &RawEvent, time_base: &TimeBase) {
        let ts = time_base.abs_ns(event.t);
        match self {
            Encoder::Verbose => batch.push_record(EventRecord {
                x: event.x as u32,
                y: event.y as u32,
                polarity: event.polarity,
                ts,
            }),
            Encoder::Compact => {
                // The batch stamp is the compact dt reference.
                let base = batch.stamp_ns();
                debug_assert!(ts >= base, "event timestamp precedes the batch time base");
                let dt = (ts.wrapping_sub(base) & DT_MASK) as u32;
                batch.push_word(pack_event(event.polarity, event.x, event.y, dt));
            }
        }
    }
}
