//! In-flight batch ownership and lifecycle.
//!
//! Exactly one batch is open at a time. Opening pre-reserves the event
//! buffer so the hot append path never reallocates, and the open batch is
//! the wire message itself: on flush it is moved to the transport, not
//! copied.

use prost::Message;

use crate::encode::Encoder;
use crate::protocol::{EventArray, EventPacket, EventRecord, Header};

/// Wire payload of a batch, tagged by encoding scheme.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchMessage {
    Verbose(EventArray),
    Compact(EventPacket),
}

/// One bounded group of encoded events, open for appends until flushed.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    msg: BatchMessage,
    stamp_ns: u64,
}

impl Batch {
    /// Absolute timestamp of the first event, nanoseconds. For the compact
    /// scheme this doubles as the `dt` reference.
    pub fn stamp_ns(&self) -> u64 {
        self.stamp_ns
    }

    pub fn header(&self) -> Option<&Header> {
        match &self.msg {
            BatchMessage::Verbose(m) => m.header.as_ref(),
            BatchMessage::Compact(m) => m.header.as_ref(),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.header().map(|h| h.sequence).unwrap_or(0)
    }

    /// Compact `dt` reference; None for verbose batches.
    pub fn time_base(&self) -> Option<u64> {
        match &self.msg {
            BatchMessage::Verbose(_) => None,
            BatchMessage::Compact(m) => Some(m.time_base),
        }
    }

    pub fn len(&self) -> usize {
        match &self.msg {
            BatchMessage::Verbose(m) => m.events.len(),
            BatchMessage::Compact(m) => m.events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn message(&self) -> &BatchMessage {
        &self.msg
    }

    /// Serialize the batch for the transport.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        match &self.msg {
            BatchMessage::Verbose(m) => m.encode_to_vec(),
            BatchMessage::Compact(m) => m.encode_to_vec(),
        }
    }

    /// Append one verbose record.
    ///
    /// # Panics
    /// Panics on a compact batch; the encoder and the open batch always
    /// share a scheme.
    pub(crate) fn push_record(&mut self, record: EventRecord) {
        match &mut self.msg {
            BatchMessage::Verbose(m) => m.events.push(record),
            BatchMessage::Compact(_) => panic!("verbose append to a compact batch"),
        }
    }

    /// Append one compact word.
    ///
    /// # Panics
    /// Panics on a verbose batch.
    pub(crate) fn push_word(&mut self, word: u64) {
        match &mut self.msg {
            BatchMessage::Verbose(_) => panic!("compact append to a verbose batch"),
            BatchMessage::Compact(m) => m.events.push(word),
        }
    }

    pub(crate) fn set_pub_time(&mut self, ns: u64) {
        let header = match &mut self.msg {
            BatchMessage::Verbose(m) => m.header.as_mut(),
            BatchMessage::Compact(m) => m.header.as_mut(),
        };
        if let Some(header) = header {
            header.pub_time = ns;
        }
    }
}

/// Per-run batch parameters, fixed at accumulator construction.
#[derive(Debug, Clone)]
pub struct BatchParams {
    pub frame_id: String,
    pub width: u16,
    pub height: u16,
    /// Events to pre-reserve per batch (expected peak rate x flush
    /// threshold).
    pub reserve: usize,
    pub encoder: Encoder,
    /// Sequence number of the first emitted batch.
    pub first_sequence: u64,
}

/// Owns the in-flight batch and its lifecycle.
#[derive(Debug)]
pub struct BatchAccumulator {
    params: BatchParams,
    next_sequence: u64,
    open: Option<Batch>,
}

impl BatchAccumulator {
    pub fn new(params: BatchParams) -> Self {
        let next_sequence = params.first_sequence;
        Self {
            params,
            next_sequence,
            open: None,
        }
    }

    /// Batch currently accepting appends, if any.
    pub fn open_batch(&self) -> Option<&Batch> {
        self.open.as_ref()
    }

    /// Sequence number the next opened batch will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Open a batch stamped with `first_event_ns` unless one is already
    /// open, in which case it is returned unchanged.
    ///
    /// The sequence counter advances only when a batch is created. For the
    /// compact scheme the stamp is also recorded as the batch time base.
    pub fn ensure_open(&mut self, first_event_ns: u64) -> &mut Batch {
        let params = &self.params;
        let next_sequence = &mut self.next_sequence;
        self.open.get_or_insert_with(|| {
            let header = Header {
                frame_id: params.frame_id.clone(),
                sequence: *next_sequence,
                stamp: first_event_ns,
                pub_time: 0,
            };
            *next_sequence += 1;
            let msg = match params.encoder {
                Encoder::Verbose => BatchMessage::Verbose(EventArray {
                    header: Some(header),
                    width: params.width as u32,
                    height: params.height as u32,
                    events: Vec::with_capacity(params.reserve),
                }),
                Encoder::Compact => BatchMessage::Compact(EventPacket {
                    header: Some(header),
                    width: params.width as u32,
                    height: params.height as u32,
                    time_base: first_event_ns,
                    events: Vec::with_capacity(params.reserve),
                }),
            };
            Batch {
                msg,
                stamp_ns: first_event_ns,
            }
        })
    }

    /// Detach the open batch for publication and reset to "no open batch".
    ///
    /// # Panics
    /// Panics when nothing is open; closing without an open batch is a
    /// programming error.
    pub fn close(&mut self) -> Batch {
        self.open.take().expect("close() called with no open batch")
    }
}
