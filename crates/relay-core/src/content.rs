//! Canonical content parts.
//!
//! [`ContentPart`] is the shared vocabulary between the response assembler,
//! the agent runtime, session history, and the orchestrator. Every consumer
//! matches on the variant tag; nothing inspects fields at runtime.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One unit of model or tool output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    /// Plain text.
    #[serde(rename = "text")]
    Text {
        /// The text body.
        text: String,
    },
    /// A tool invocation requested by the model.
    #[serde(rename = "function_call")]
    FunctionCall {
        /// Correlation ID shared with the matching response or approval.
        id: String,
        /// Tool name.
        name: String,
        /// Tool arguments.
        #[serde(default)]
        args: Map<String, Value>,
    },
    /// The result of a tool invocation.
    #[serde(rename = "function_response")]
    FunctionResponse {
        /// ID of the call this responds to.
        id: String,
        /// Tool name.
        name: String,
        /// Tool output.
        #[serde(default)]
        response: Map<String, Value>,
    },
    /// Output of model-side code execution.
    #[serde(rename = "code_execution_result")]
    CodeExecutionResult {
        /// Outcome label (e.g. `OUTCOME_OK`).
        outcome: String,
        /// Captured output.
        output: String,
    },
    /// Code the model wants executed.
    #[serde(rename = "executable_code")]
    ExecutableCode {
        /// Source code.
        code: String,
        /// Language of the source.
        language: String,
    },
}

impl ContentPart {
    /// Create a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a function call part.
    #[must_use]
    pub fn function_call(
        id: impl Into<String>,
        name: impl Into<String>,
        args: Map<String, Value>,
    ) -> Self {
        Self::FunctionCall {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// Create a function response part.
    #[must_use]
    pub fn function_response(
        id: impl Into<String>,
        name: impl Into<String>,
        response: Map<String, Value>,
    ) -> Self {
        Self::FunctionResponse {
            id: id.into(),
            name: name.into(),
            response,
        }
    }

    /// Text body, if this is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns `true` for function call and function response parts.
    #[must_use]
    pub fn is_tool_content(&self) -> bool {
        matches!(
            self,
            Self::FunctionCall { .. } | Self::FunctionResponse { .. }
        )
    }

    /// Returns `true` if this is a function call.
    #[must_use]
    pub fn is_function_call(&self) -> bool {
        matches!(self, Self::FunctionCall { .. })
    }

    /// Correlation ID for call/response parts.
    #[must_use]
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::FunctionCall { id, .. } | Self::FunctionResponse { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Tag string of the variant, as written on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::FunctionCall { .. } => "function_call",
            Self::FunctionResponse { .. } => "function_response",
            Self::CodeExecutionResult { .. } => "code_execution_result",
            Self::ExecutableCode { .. } => "executable_code",
        }
    }
}

/// Return the first non-empty text body in `parts`.
pub fn first_text(parts: &[ContentPart]) -> Option<&str> {
    parts
        .iter()
        .filter_map(ContentPart::as_text)
        .find(|t| !t.trim().is_empty())
}
