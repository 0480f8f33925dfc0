//! Streaming handoff: two ordered units from the pipeline to a transport.
//!
//! The dispatcher is a two-stage producer: the classification unit right
//! after classification completes, then the branch response as the second
//! and final unit. A transport drains a [`ResponseSink`] in order and must
//! not wait for the second unit before forwarding the first.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// One unit of streamed pipeline output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUnit {
    /// The classification text, emitted immediately after classification.
    Classification(String),
    /// The branch response, emitted last.
    Result(String),
}

/// Two-stage producer interface the dispatcher drives in order.
///
/// `emit_classification` is called exactly once, then `emit_result`
/// exactly once; the sequence is finite and never restarted within a
/// request.
#[async_trait]
pub trait ResponseSink: Send {
    /// Forward the classification unit.
    async fn emit_classification(&mut self, classification: &str);
    /// Forward the final response unit.
    async fn emit_result(&mut self, response: &str);
}

/// Channel-backed sink for transports that consume a receiver.
///
/// Each emitted unit is forwarded through a tokio mpsc channel as soon
/// as it is produced, so the consumer can transmit unit one while the
/// branch producing unit two is still running. A dropped receiver makes
/// sends no-ops; the transport went away and there is nobody to notify.
pub struct ChannelSink {
    tx: mpsc::Sender<StreamUnit>,
}

impl ChannelSink {
    /// Create a sink and the receiver a transport drains.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StreamUnit>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn emit_classification(&mut self, classification: &str) {
        let _ = self
            .tx
            .send(StreamUnit::Classification(classification.to_owned()))
            .await;
    }

    async fn emit_result(&mut self, response: &str) {
        let _ = self.tx.send(StreamUnit::Result(response.to_owned())).await;
    }
}

/// Buffering sink that records units in order; used by batch callers and
/// tests that only need the final sequence.
#[derive(Debug, Default)]
pub struct CollectingSink {
    units: Vec<StreamUnit>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The units emitted so far, in order.
    pub fn units(&self) -> &[StreamUnit] {
        &self.units
    }
}

#[async_trait]
impl ResponseSink for CollectingSink {
    async fn emit_classification(&mut self, classification: &str) {
        self.units
            .push(StreamUnit::Classification(classification.to_owned()));
    }

    async fn emit_result(&mut self, response: &str) {
        self.units.push(StreamUnit::Result(response.to_owned()));
    }
}
