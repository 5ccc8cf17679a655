//! Zenoh transport sink.

use zenoh::pubsub::Publisher;
use zenoh::{Session, Wait};

use crate::batch::Batch;
use crate::error::{BridgeError, Result};
use crate::pipeline::EventSink;

/// Publishes finished batches on a Zenoh topic.
pub struct ZenohEventSink {
    publisher: Publisher<'static>,
    topic: String,
}

impl ZenohEventSink {
    /// Declare the events publisher on `session`.
    pub fn new(session: &Session, topic: &str) -> Result<Self> {
        let publisher = session
            .declare_publisher(topic.to_string())
            .wait()
            .map_err(|e| BridgeError::Transport(format!("declare '{topic}' failed: {e}")))?;
        log::info!("Publishing events on '{topic}'");
        Ok(Self {
            publisher,
            topic: topic.to_string(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl EventSink for ZenohEventSink {
    fn has_subscribers(&self) -> bool {
        // A failed status query counts as a present subscriber.
        self.publisher
            .matching_status()
            .wait()
            .map(|status| status.matching())
            .unwrap_or(true)
    }

    fn publish(&mut self, batch: Batch) -> Result<()> {
        self.publisher.put(batch.encode_to_vec()).wait().map_err(|e| {
            BridgeError::Transport(format!("publish on '{}' failed: {e}", self.topic))
        })
    }
}
