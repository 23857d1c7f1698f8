//! Session and stored-event types.
//!
//! A [`StoredEvent`] is the canonical `ExecutionEvent` with storage fields at
//! the top level:
//!
//! ```json
//! {"id": "…", "timestamp": "2026-…Z", "kind": "execution",
//!  "author": "assistant", "partial": false, "content": [ … ]}
//! ```

use chrono::{SecondsFormat, Utc};
use relay_core::content::ContentPart;
use relay_core::events::ExecutionEvent;
use relay_core::ids::EventId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author recorded on header events.
pub const HEADER_AUTHOR: &str = "user";

/// What a stored event records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredEventKind {
    /// Synthetic event written before a turn runs (the inbound message).
    Header,
    /// An event produced by the agent runtime.
    #[default]
    Execution,
}

/// A persisted session event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    /// Unique event ID (UUID v7).
    pub id: EventId,
    /// RFC 3339 timestamp, UTC.
    pub timestamp: String,
    /// Header or execution event.
    #[serde(default)]
    pub kind: StoredEventKind,
    /// The event itself, flattened into the top level.
    #[serde(flatten)]
    pub event: ExecutionEvent,
}

impl StoredEvent {
    /// Wrap a runtime event for storage.
    #[must_use]
    pub fn execution(event: ExecutionEvent) -> Self {
        Self::with_kind(StoredEventKind::Execution, event)
    }

    /// Build the header event for a turn from the inbound parts.
    #[must_use]
    pub fn header(invocation_id: impl Into<String>, parts: Vec<ContentPart>) -> Self {
        let event = ExecutionEvent::new(HEADER_AUTHOR, parts).with_invocation_id(invocation_id);
        Self::with_kind(StoredEventKind::Header, event)
    }

    fn with_kind(kind: StoredEventKind, event: ExecutionEvent) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            kind,
            event,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A conversation session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session ID (the A2A context id).
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Owning application.
    pub app_name: String,
    /// Display name, derived from the first message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form session state.
    #[serde(default)]
    pub state: Map<String, Value>,
    /// Ordered event log.
    #[serde(default)]
    pub events: Vec<StoredEvent>,
}

impl Session {
    /// Execution events, oldest first, skipping headers.
    pub fn execution_events(&self) -> impl Iterator<Item = &ExecutionEvent> {
        self.events
            .iter()
            .filter(|e| e.kind == StoredEventKind::Execution)
            .map(|e| &e.event)
    }

    /// The most recent execution event, if any.
    #[must_use]
    pub fn last_execution_event(&self) -> Option<&ExecutionEvent> {
        self.events
            .iter()
            .rev()
            .find(|e| e.kind == StoredEventKind::Execution)
            .map(|e| &e.event)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
