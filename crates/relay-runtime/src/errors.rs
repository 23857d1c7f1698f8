//! Runtime error types.

use std::time::Duration;

use relay_core::errors::{GENERIC_ERROR_MESSAGE, classify_transport_error};
use relay_events::SessionError;
use relay_llm::ProviderError;

/// User-facing sentence for a tool failure without a transport cause.
pub const TOOL_FAILURE_MESSAGE: &str = "A tool failed while handling your request.";

/// User-facing sentence for a session storage failure.
pub const SESSION_FAILURE_MESSAGE: &str =
    "The conversation history could not be loaded or saved. Please try again.";

/// Failure writing to the outbound event sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The receiving side has gone away.
    #[error("Sink closed")]
    Closed,

    /// The sink refused the event.
    #[error("Sink rejected event: {0}")]
    Rejected(String),
}

impl SinkError {
    /// Error category string for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// Errors that can occur while executing a turn.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Writing to the outbound sink failed. Always fatal.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// LLM provider error surfaced by the agent runtime.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Tool execution error surfaced by the agent runtime.
    #[error("Tool error: {tool_name}: {message}")]
    Tool {
        /// Tool name.
        tool_name: String,
        /// Error description.
        message: String,
    },

    /// Session lookup or persistence error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The agent runtime did not finish within the execution timeout.
    #[error("Execution timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Internal / unexpected error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Whether the error aborts the turn instead of becoming a `Failed` status.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Sink(_))
    }

    /// Error category string for event emission.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Sink(_) => "sink",
            Self::Provider(_) => "provider",
            Self::Tool { .. } => "tool",
            Self::Session(_) => "session",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }

    /// Error code and message reported on the `Failed` status.
    ///
    /// Provider and tool failures go through transport classification so
    /// connectivity problems surface as `MCP_*` codes. The message is always
    /// a fixed sentence; the error text itself only reaches the logs.
    pub fn failure(&self) -> (String, String) {
        match self {
            Self::Provider(e) => e.failure(),
            Self::Tool { message, .. } => match classify_transport_error(message) {
                Some(kind) => (kind.code().to_owned(), kind.user_message().to_owned()),
                None => ("TOOL_ERROR".into(), TOOL_FAILURE_MESSAGE.into()),
            },
            Self::Timeout(limit) => (
                "EXECUTION_TIMEOUT".into(),
                format!(
                    "The agent did not finish within {} seconds and was stopped.",
                    limit.as_secs()
                ),
            ),
            Self::Session(_) => ("SESSION_ERROR".into(), SESSION_FAILURE_MESSAGE.into()),
            other => (
                format!("{}_ERROR", other.category().to_uppercase()),
                GENERIC_ERROR_MESSAGE.into(),
            ),
        }
    }
}
