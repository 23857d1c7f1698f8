//! Outbound event sink.
//!
//! The executor writes every protocol event through an [`EventSink`]. The
//! transport behind it (SSE, websocket, queue) is not this crate's concern.

use async_trait::async_trait;
use relay_core::protocol::ProtocolEvent;
use tokio::sync::mpsc;

use crate::errors::SinkError;

/// Destination for outbound protocol events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Write one event. An error aborts the turn.
    async fn write(&self, event: ProtocolEvent) -> Result<(), SinkError>;
}

/// Sink backed by a bounded channel.
///
/// Writes wait for capacity, so a slow reader applies backpressure to the
/// turn.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ProtocolEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ProtocolEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn write(&self, event: ProtocolEvent) -> Result<(), SinkError> {
        self.tx.send(event).await.map_err(|_| SinkError::Closed)
    }
}
