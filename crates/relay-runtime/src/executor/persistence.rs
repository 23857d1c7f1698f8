//! Session-append policy and the detached history writer.
//!
//! Appends for one turn are serialized through an MPSC channel to a single
//! spawned worker, so history keeps the runtime's order and a dropped caller
//! does not drop writes already queued. Each append runs under its own
//! timeout; failures are logged and swallowed.

use std::sync::Arc;
use std::time::Duration;

use relay_core::events::{ExecutionEvent, ToolContentCarrier};
use relay_events::{SessionKey, SessionService, StoredEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const QUEUE_CAPACITY: usize = 256;

/// Whether an event belongs in session history.
///
/// Non-partial events always do. Partial events only when they carry a
/// function call or response, since a lost tool result corrupts replay.
pub fn should_persist(event: &ExecutionEvent) -> bool {
    !event.partial || event.has_tool_content()
}

enum WriteRequest {
    Append(Box<StoredEvent>),
    Flush(oneshot::Sender<()>),
}

/// Linearized, detached session appender for one turn.
pub struct SessionWriter {
    tx: mpsc::Sender<WriteRequest>,
    worker: JoinHandle<()>,
}

impl SessionWriter {
    /// Spawn the worker for `key`.
    pub fn spawn(
        service: Arc<dyn SessionService>,
        key: SessionKey,
        append_timeout: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let worker = tokio::spawn(write_worker(rx, service, key, append_timeout));
        Self { tx, worker }
    }

    /// Queue an append. Waits only for queue capacity, never for storage.
    pub async fn append(&self, event: StoredEvent) {
        if self
            .tx
            .send(WriteRequest::Append(Box::new(event)))
            .await
            .is_err()
        {
            warn!(finished = self.worker.is_finished(), "session writer gone, history event dropped");
        }
    }

    /// Wait until every queued append has been attempted.
    pub async fn flush(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(WriteRequest::Flush(reply_tx)).await.is_ok() {
            let _ = reply_rx.await;
        }
    }
}

async fn write_worker(
    mut rx: mpsc::Receiver<WriteRequest>,
    service: Arc<dyn SessionService>,
    key: SessionKey,
    append_timeout: Duration,
) {
    while let Some(req) = rx.recv().await {
        match req {
            WriteRequest::Append(event) => {
                let id = event.id.clone();
                match tokio::time::timeout(append_timeout, service.append_event(&key, *event))
                    .await
                {
                    Ok(Ok(())) => debug!(session_id = %key.session_id, event_id = %id, "session event appended"),
                    Ok(Err(e)) => warn!(
                        session_id = %key.session_id,
                        event_id = %id,
                        error = %e,
                        category = e.category(),
                        "session append failed"
                    ),
                    Err(_) => warn!(
                        session_id = %key.session_id,
                        event_id = %id,
                        timeout_ms = u64::try_from(append_timeout.as_millis()).unwrap_or(u64::MAX),
                        "session append timed out"
                    ),
                }
            }
            WriteRequest::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
