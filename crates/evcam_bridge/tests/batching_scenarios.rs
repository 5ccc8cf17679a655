//! End-to-end batching scenarios through the node composition.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use evcam_bridge::batch::{Batch, BatchMessage, BatchParams};
use evcam_bridge::config::Config;
use evcam_bridge::encode::{unpack_event, Encoder};
use evcam_bridge::flush::FlushPolicy;
use evcam_bridge::node::BridgeNode;
use evcam_bridge::pipeline::{EventSink, Pipeline};
use evcam_bridge::synthetic::SyntheticCamera;
use evcam_bridge::time_base::TimeBase;

/// Sink that records published batches for inspection after a run.
#[derive(Clone)]
struct RecordingSink {
    batches: Arc<Mutex<Vec<Batch>>>,
    subscribed: Arc<AtomicBool>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
            subscribed: Arc::new(AtomicBool::new(true)),
        }
    }

    fn batches(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn has_subscribers(&self) -> bool {
        self.subscribed.load(Ordering::Relaxed)
    }

    fn publish(&mut self, batch: Batch) -> evcam_bridge::Result<()> {
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }
}

const ORIGIN_NS: u64 = 1_000_000_000_000;

fn test_node(
    encoder: Encoder,
    multithreaded: bool,
    slices: u64,
    sink: RecordingSink,
) -> BridgeNode<RecordingSink> {
    // 320 events spread over 200 us per slice against a 100 us threshold:
    // every slice closes one batch.
    let camera = SyntheticCamera::new("00001508", 640, 480, 320, Duration::from_micros(200))
        .with_max_slices(slices);
    let params = BatchParams {
        frame_id: "1508".into(),
        width: 640,
        height: 480,
        reserve: 512,
        encoder,
        first_sequence: 7,
    };
    let pipeline = Pipeline::new(sink, params, FlushPolicy::new(Duration::from_micros(100)))
        .with_time_base(TimeBase::at(ORIGIN_NS));
    let config = Config {
        use_multithreading: multithreaded,
        // Keep test logs quiet.
        statistics_print_interval_secs: 0,
        ..Config::default()
    };
    BridgeNode::new(Box::new(camera), pipeline, "1508".into(), &config)
}

#[test]
fn test_single_threaded_run_emits_contiguous_batches() {
    let sink = RecordingSink::new();
    let mut node = test_node(Encoder::Compact, false, 50, sink.clone());
    node.run().unwrap();

    let batches = sink.batches();
    assert_eq!(batches.len(), 50);
    for (i, batch) in batches.iter().enumerate() {
        assert_eq!(batch.sequence(), 7 + i as u64);
        assert_eq!(batch.len(), 320);
    }

    let snap = node.counters().snapshot();
    assert_eq!(snap.events_total(), 50 * 320);
    assert_eq!(snap.events_sent, 50 * 320);
    assert_eq!(snap.msgs_sent, 50);
    assert_eq!(snap.events_on, snap.events_off);
}

#[test]
fn test_multithreaded_run_matches_single_threaded_accounting() {
    let sink = RecordingSink::new();
    let mut node = test_node(Encoder::Compact, true, 50, sink.clone());
    node.run().unwrap();

    let batches = sink.batches();
    assert_eq!(batches.len(), 50);
    for (i, batch) in batches.iter().enumerate() {
        assert_eq!(batch.sequence(), 7 + i as u64);
    }

    let snap = node.counters().snapshot();
    assert_eq!(snap.events_total(), 50 * 320);
    assert_eq!(snap.msgs_sent, 50);
}

#[test]
fn test_compact_batches_restart_dt_per_batch() {
    let sink = RecordingSink::new();
    let mut node = test_node(Encoder::Compact, false, 4, sink.clone());
    node.run().unwrap();

    for batch in sink.batches() {
        assert_eq!(batch.time_base(), Some(batch.stamp_ns()));
        match batch.message() {
            BatchMessage::Compact(m) => {
                let (_, _, _, first_dt) = unpack_event(m.events[0]);
                assert_eq!(first_dt, 0);
                let mut last_dt = 0;
                for word in &m.events {
                    let (_, y, x, dt) = unpack_event(*word);
                    assert!(dt >= last_dt, "dt regressed within a batch");
                    last_dt = dt;
                    assert!(x < 640);
                    assert!(y < 480);
                }
                // 200 us of sensor time per batch.
                assert!(last_dt < 200_000);
            }
            BatchMessage::Verbose(_) => panic!("expected compact batches"),
        }
    }
}

#[test]
fn test_verbose_batches_carry_absolute_timestamps() {
    let sink = RecordingSink::new();
    let mut node = test_node(Encoder::Verbose, false, 3, sink.clone());
    node.run().unwrap();

    let batches = sink.batches();
    assert_eq!(batches.len(), 3);
    let mut last_ts = 0;
    for batch in &batches {
        assert_eq!(batch.time_base(), None);
        match batch.message() {
            BatchMessage::Verbose(m) => {
                for event in &m.events {
                    assert!(event.ts >= ORIGIN_NS);
                    assert!(event.ts >= last_ts, "timestamps regressed");
                    last_ts = event.ts;
                }
            }
            BatchMessage::Compact(_) => panic!("expected verbose batches"),
        }
        let header = batch.header().unwrap();
        assert_eq!(header.frame_id, "1508");
        assert_eq!(header.stamp, batch.stamp_ns());
        assert!(header.pub_time > 0);
    }
}

#[test]
fn test_without_subscribers_nothing_is_encoded() {
    let sink = RecordingSink::new();
    sink.subscribed.store(false, Ordering::Relaxed);
    let mut node = test_node(Encoder::Compact, false, 10, sink.clone());
    node.run().unwrap();

    assert!(sink.batches().is_empty());
    let snap = node.counters().snapshot();
    assert_eq!(snap.events_total(), 0);
    assert_eq!(snap.msgs_sent, 0);
}

#[test]
fn test_bias_file_is_applied_at_startup() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# default tuning").unwrap();
    writeln!(file, "299 % bias_diff").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "25 % bias_refr").unwrap();

    let sink = RecordingSink::new();
    let mut node = test_node(Encoder::Compact, false, 1, sink);
    node.apply_bias_file(file.path()).unwrap();
    assert_eq!(node.bias("bias_diff").unwrap(), 299);
    assert_eq!(node.bias("bias_refr").unwrap(), 25);
}

#[test]
fn test_malformed_bias_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "bias_diff = 299").unwrap();

    let sink = RecordingSink::new();
    let mut node = test_node(Encoder::Compact, false, 1, sink);
    assert!(node.apply_bias_file(file.path()).is_err());
}
