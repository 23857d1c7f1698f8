//! Turn-scoped protocol event factory.
//!
//! Stamps every outbound event with the turn's task and context IDs and the
//! run-scoped metadata (`app_name`, `user_id`, `session_id`), then writes it
//! to the sink.

use relay_core::constants::{META_APP_NAME, META_SESSION_ID, META_USER_ID};
use relay_core::ids::ArtifactId;
use relay_core::protocol::{
    Artifact, Message, Metadata, Part, ProtocolEvent, TaskArtifactUpdateEvent, TaskState,
    TaskStatus, TaskStatusUpdateEvent,
};
use serde_json::Value;
use tracing::error;

use crate::errors::SinkError;
use crate::sink::EventSink;

/// Writes protocol events for one turn.
pub struct TurnEmitter<'a> {
    sink: &'a dyn EventSink,
    task_id: String,
    context_id: String,
    metadata: Metadata,
}

impl<'a> TurnEmitter<'a> {
    /// Create an emitter for one turn.
    pub fn new(
        sink: &'a dyn EventSink,
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        app_name: &str,
        user_id: &str,
    ) -> Self {
        let context_id = context_id.into();
        let mut metadata = Metadata::new();
        let _ = metadata.insert(META_APP_NAME.into(), Value::String(app_name.into()));
        let _ = metadata.insert(META_USER_ID.into(), Value::String(user_id.into()));
        let _ = metadata.insert(META_SESSION_ID.into(), Value::String(context_id.clone()));
        Self {
            sink,
            task_id: task_id.into(),
            context_id,
            metadata,
        }
    }

    /// Run-scoped metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Write a status update. `extra` is merged over the run-scoped metadata.
    pub async fn status(
        &self,
        state: TaskState,
        message: Option<Message>,
        is_final: bool,
        extra: Metadata,
    ) -> Result<(), SinkError> {
        let message = message.map(|m| m.with_task(&self.task_id, &self.context_id));
        let event = ProtocolEvent::StatusUpdate(TaskStatusUpdateEvent {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            status: TaskStatus::now(state, message),
            is_final,
            metadata: self.merged(extra),
        });
        self.write(event).await
    }

    /// Write the turn's final artifact.
    pub async fn artifact(&self, parts: Vec<Part>) -> Result<(), SinkError> {
        let event = ProtocolEvent::ArtifactUpdate(TaskArtifactUpdateEvent {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            artifact: Artifact {
                artifact_id: ArtifactId::new(),
                parts,
                name: None,
            },
            append: false,
            last_chunk: true,
            metadata: self.metadata.clone(),
        });
        self.write(event).await
    }

    fn merged(&self, extra: Metadata) -> Metadata {
        let mut metadata = self.metadata.clone();
        metadata.extend(extra);
        metadata
    }

    async fn write(&self, event: ProtocolEvent) -> Result<(), SinkError> {
        self.sink.write(event).await.inspect_err(|e| {
            error!(task_id = %self.task_id, error = %e, category = e.category(), "sink write failed");
        })
    }
}
