//! A2A protocol vocabulary.
//!
//! The outbound side of the bridge: task states, messages, parts, and the two
//! streamed event kinds ([`TaskStatusUpdateEvent`], [`TaskArtifactUpdateEvent`]).
//! Field names follow the A2A JSON wire format (camelCase, `kind`
//! discriminators, kebab-case task states).
//!
//! Canonical [`ContentPart`]s cross this boundary exactly once, in
//! [`Part::from_content_part`] (outbound) and [`Part::to_content_part`]
//! (inbound).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::constants::{PART_META_LONG_RUNNING, PART_META_TYPE};
use crate::content::ContentPart;
use crate::ids::{ArtifactId, MessageId};

/// Metadata map attached to events, messages, and parts.
pub type Metadata = Map<String, Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Task state
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Accepted, not yet running.
    Submitted,
    /// Running.
    Working,
    /// Paused until the user supplies input (e.g. a tool approval).
    InputRequired,
    /// Paused until the user supplies credentials.
    AuthRequired,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Canceled before completion.
    Canceled,
    /// Refused by the agent.
    Rejected,
    /// Indeterminate.
    Unknown,
}

impl TaskState {
    /// Whether no further work happens in this state without a new message.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Canceled | Self::Rejected
        )
    }

    /// Whether this state pauses the task for user action.
    #[must_use]
    pub fn is_interrupted(self) -> bool {
        matches!(self, Self::InputRequired | Self::AuthRequired)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::InputRequired => "input-required",
            Self::AuthRequired => "auth-required",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages and parts
// ─────────────────────────────────────────────────────────────────────────────

/// Sender of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The client.
    User,
    /// The agent service.
    Agent,
}

/// One piece of message or artifact content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    /// Text segment.
    Text {
        /// The text.
        text: String,
        /// Optional part metadata.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
    /// Structured data segment.
    Data {
        /// The data.
        data: Value,
        /// Optional part metadata.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
}

/// Failure to decode a wire part into a canonical [`ContentPart`].
#[derive(Debug, Error)]
pub enum PartDecodeError {
    /// A typed data part did not match its declared shape.
    #[error("malformed {kind} data part: {source}")]
    Malformed {
        /// Declared part kind.
        kind: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl Part {
    /// Create a text part without metadata.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            metadata: None,
        }
    }

    /// Create a data part without metadata.
    #[must_use]
    pub fn data(data: Value) -> Self {
        Self::Data {
            data,
            metadata: None,
        }
    }

    /// Text body, if this is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            Self::Data { .. } => None,
        }
    }

    /// Data payload, if this is a data part.
    #[must_use]
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data { data, .. } => Some(data),
            Self::Text { .. } => None,
        }
    }

    /// Part metadata, if any.
    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            Self::Text { metadata, .. } | Self::Data { metadata, .. } => metadata.as_ref(),
        }
    }

    /// Whether this part encodes a function call flagged as long-running.
    #[must_use]
    pub fn is_long_running_call(&self) -> bool {
        self.metadata().is_some_and(|m| {
            m.get(PART_META_TYPE).and_then(Value::as_str) == Some("function_call")
                && m.get(PART_META_LONG_RUNNING).and_then(Value::as_bool) == Some(true)
        })
    }

    /// Encode a canonical part for the wire.
    ///
    /// Text stays text. Every other variant becomes a data part whose
    /// metadata `type` names the canonical variant; function calls also carry
    /// `is_long_running`.
    #[must_use]
    pub fn from_content_part(part: &ContentPart, long_running: bool) -> Self {
        let (data, mut metadata) = match part {
            ContentPart::Text { text } => return Self::text(text.clone()),
            ContentPart::FunctionCall { id, name, args } => {
                let mut metadata = Metadata::new();
                let _ = metadata.insert(PART_META_LONG_RUNNING.into(), Value::Bool(long_running));
                (json!({"id": id, "name": name, "args": args}), metadata)
            }
            ContentPart::FunctionResponse { id, name, response } => (
                json!({"id": id, "name": name, "response": response}),
                Metadata::new(),
            ),
            ContentPart::CodeExecutionResult { outcome, output } => (
                json!({"outcome": outcome, "output": output}),
                Metadata::new(),
            ),
            ContentPart::ExecutableCode { code, language } => (
                json!({"code": code, "language": language}),
                Metadata::new(),
            ),
        };
        let _ = metadata.insert(PART_META_TYPE.into(), Value::String(part.kind().into()));
        Self::Data {
            data,
            metadata: Some(metadata),
        }
    }

    /// Decode a wire part into a canonical part.
    ///
    /// Data parts whose metadata `type` names a canonical variant are decoded
    /// into that variant. Untyped data parts become text holding their JSON.
    pub fn to_content_part(&self) -> Result<ContentPart, PartDecodeError> {
        match self {
            Self::Text { text, .. } => Ok(ContentPart::text(text.clone())),
            Self::Data { data, metadata } => {
                let kind = metadata
                    .as_ref()
                    .and_then(|m| m.get(PART_META_TYPE))
                    .and_then(Value::as_str);
                match kind {
                    Some(
                        kind @ ("function_call"
                        | "function_response"
                        | "code_execution_result"
                        | "executable_code"),
                    ) => {
                        let mut tagged = match data {
                            Value::Object(map) => map.clone(),
                            _ => Map::new(),
                        };
                        let _ = tagged.insert("type".into(), Value::String(kind.into()));
                        serde_json::from_value(Value::Object(tagged)).map_err(|source| {
                            PartDecodeError::Malformed {
                                kind: kind.to_owned(),
                                source,
                            }
                        })
                    }
                    _ => Ok(ContentPart::text(data.to_string())),
                }
            }
        }
    }
}

/// A message exchanged between client and agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID.
    pub message_id: MessageId,
    /// Sender.
    pub role: Role,
    /// Ordered content.
    pub parts: Vec<Part>,
    /// Task this message belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Conversation context (session) ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    /// Optional message metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Message {
    /// Create an agent-authored message.
    #[must_use]
    pub fn agent(parts: Vec<Part>) -> Self {
        Self {
            message_id: MessageId::new(),
            role: Role::Agent,
            parts,
            task_id: None,
            context_id: None,
            metadata: None,
        }
    }

    /// Create a user-authored message.
    #[must_use]
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            ..Self::agent(parts)
        }
    }

    /// Create an agent message holding a single text part.
    #[must_use]
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self::agent(vec![Part::text(text)])
    }

    /// Attach task and context IDs.
    #[must_use]
    pub fn with_task(mut self, task_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self.context_id = Some(context_id.into());
        self
    }

    /// Concatenated text of all text parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Streamed events
// ─────────────────────────────────────────────────────────────────────────────

/// Status of a task at a point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Lifecycle state.
    pub state: TaskState,
    /// Optional human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TaskStatus {
    /// Create a status stamped with the current UTC time.
    #[must_use]
    pub fn now(state: TaskState, message: Option<Message>) -> Self {
        Self {
            state,
            message,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Notifies the client of a task status change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    /// Task ID.
    pub task_id: String,
    /// Context (session) ID.
    pub context_id: String,
    /// New status.
    pub status: TaskStatus,
    /// Last event of this interaction.
    #[serde(rename = "final")]
    pub is_final: bool,
    /// Run-scoped metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

/// A generated output of a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Artifact ID, unique within the task.
    pub artifact_id: ArtifactId,
    /// Content.
    pub parts: Vec<Part>,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Notifies the client of a new or updated artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    /// Task ID.
    pub task_id: String,
    /// Context (session) ID.
    pub context_id: String,
    /// The artifact.
    pub artifact: Artifact,
    /// Append to a previously sent artifact with the same ID.
    #[serde(default)]
    pub append: bool,
    /// Final chunk of this artifact.
    #[serde(default)]
    pub last_chunk: bool,
    /// Run-scoped metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

/// Any event written to the outbound sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ProtocolEvent {
    /// Status change.
    #[serde(rename = "status-update")]
    StatusUpdate(TaskStatusUpdateEvent),
    /// Artifact change.
    #[serde(rename = "artifact-update")]
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

impl ProtocolEvent {
    /// Whether this is the final event of the turn.
    #[must_use]
    pub fn is_final(&self) -> bool {
        match self {
            Self::StatusUpdate(e) => e.is_final,
            Self::ArtifactUpdate(_) => false,
        }
    }

    /// Task state, for status updates.
    #[must_use]
    pub fn state(&self) -> Option<TaskState> {
        match self {
            Self::StatusUpdate(e) => Some(e.status.state),
            Self::ArtifactUpdate(_) => None,
        }
    }

    /// Event metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        match self {
            Self::StatusUpdate(e) => &e.metadata,
            Self::ArtifactUpdate(e) => &e.metadata,
        }
    }
}
