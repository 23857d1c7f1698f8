//! Execution events produced by the agent runtime.
//!
//! An [`ExecutionEvent`] is one unit of progress: a model turn fragment, a
//! tool call, a tool result, or a runtime error. The orchestrator consumes
//! each event exactly once.
//!
//! Fields that used to be pulled off arbitrary event values are exposed
//! through two small capability traits, [`ErrorCarrier`] and
//! [`ToolContentCarrier`], implemented explicitly by every event type that
//! crosses a seam.

use serde::{Deserialize, Serialize};

use crate::constants::{NORMAL_COMPLETION_CODE, REQUEST_CREDENTIAL_FUNCTION_NAME};
use crate::content::ContentPart;

/// Canonical finish reason of a model response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    /// Natural stop (including stops to call tools).
    Stop,
    /// Output token limit reached.
    MaxTokens,
    /// Blocked by a content filter.
    Safety,
}

impl FinishReason {
    /// Canonical error code for this reason (`STOP`, `MAX_TOKENS`, `SAFETY`).
    #[must_use]
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Stop => "STOP",
            Self::MaxTokens => "MAX_TOKENS",
            Self::Safety => "SAFETY",
        }
    }
}

/// Token accounting attached to a model response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Prompt tokens.
    pub prompt_tokens: u64,
    /// Completion tokens.
    pub completion_tokens: u64,
    /// Total tokens as reported by the backend.
    pub total_tokens: u64,
}

/// Access to error information on an event-like value.
pub trait ErrorCarrier {
    /// Canonical error code, if any.
    fn error_code(&self) -> Option<&str>;

    /// Backend-supplied error message, if any.
    fn error_message(&self) -> Option<&str>;

    /// Whether this value reports a failure.
    ///
    /// `STOP` is normal completion and never counts as a failure.
    fn is_failure(&self) -> bool {
        self.error_code()
            .is_some_and(|code| !code.is_empty() && code != NORMAL_COMPLETION_CODE)
    }
}

/// Access to tool-call content on an event-like value.
pub trait ToolContentCarrier {
    /// The content parts carried by this value.
    fn parts(&self) -> &[ContentPart];

    /// Whether any part is a function call or function response.
    fn has_tool_content(&self) -> bool {
        self.parts().iter().any(ContentPart::is_tool_content)
    }

    /// Iterate function call parts as `(id, name, args)`.
    fn function_calls(
        &self,
    ) -> impl Iterator<Item = (&str, &str, &serde_json::Map<String, serde_json::Value>)> {
        self.parts().iter().filter_map(|p| match p {
            ContentPart::FunctionCall { id, name, args } => {
                Some((id.as_str(), name.as_str(), args))
            }
            _ => None,
        })
    }
}

/// One unit of progress from the agent runtime.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    /// Who produced the event (agent name or `user`).
    pub author: String,
    /// Runtime invocation this event belongs to.
    #[serde(default)]
    pub invocation_id: String,
    /// Incremental fragment, valid for live display only.
    #[serde(default)]
    pub partial: bool,
    /// Content parts.
    #[serde(default)]
    pub content: Vec<ContentPart>,
    /// IDs of function calls awaiting out-of-band completion.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub long_running_ids: Vec<String>,
    /// Canonical error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable error message from the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Finish reason of the model response this event was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Token usage of the model response this event was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetadata>,
}

impl ExecutionEvent {
    /// Create a complete (non-partial) event.
    #[must_use]
    pub fn new(author: impl Into<String>, content: Vec<ContentPart>) -> Self {
        Self {
            author: author.into(),
            content,
            ..Self::default()
        }
    }

    /// Create a partial (streaming fragment) event.
    #[must_use]
    pub fn partial(author: impl Into<String>, content: Vec<ContentPart>) -> Self {
        Self {
            author: author.into(),
            partial: true,
            content,
            ..Self::default()
        }
    }

    /// Create an error event.
    #[must_use]
    pub fn error(
        author: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            error_code: Some(code.into()),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Set the invocation ID.
    #[must_use]
    pub fn with_invocation_id(mut self, invocation_id: impl Into<String>) -> Self {
        self.invocation_id = invocation_id.into();
        self
    }

    /// Set the long-running call IDs.
    #[must_use]
    pub fn with_long_running_ids(mut self, ids: Vec<String>) -> Self {
        self.long_running_ids = ids;
        self
    }

    /// Whether the given call ID is awaiting out-of-band completion.
    #[must_use]
    pub fn is_long_running(&self, call_id: &str) -> bool {
        self.long_running_ids.iter().any(|id| id == call_id)
    }

    /// Function calls that are long-running and not credential requests.
    ///
    /// These are the calls that need a human approval decision.
    pub fn pending_approval_calls(
        &self,
    ) -> impl Iterator<Item = (&str, &str, &serde_json::Map<String, serde_json::Value>)> {
        self.function_calls().filter(|(id, name, _)| {
            self.is_long_running(id) && *name != REQUEST_CREDENTIAL_FUNCTION_NAME
        })
    }

    /// Whether the event carries no content parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl ErrorCarrier for ExecutionEvent {
    fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

impl ToolContentCarrier for ExecutionEvent {
    fn parts(&self) -> &[ContentPart] {
        &self.content
    }
}
