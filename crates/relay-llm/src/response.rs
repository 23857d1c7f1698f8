//! Canonical model response.

use serde::{Deserialize, Serialize};

use relay_core::content::ContentPart;
use relay_core::events::{
    ErrorCarrier, ExecutionEvent, FinishReason, ToolContentCarrier, UsageMetadata,
};

use crate::provider::ProviderError;

/// One item produced by the [`ResponseAssembler`](crate::ResponseAssembler).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResponse {
    /// Content parts. Partial responses carry only the latest text delta.
    #[serde(default)]
    pub content: Vec<ContentPart>,
    /// Incremental fragment for live display.
    #[serde(default)]
    pub partial: bool,
    /// The backend signalled the end of the turn.
    #[serde(default)]
    pub turn_complete: bool,
    /// Canonical finish reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Token usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetadata>,
    /// Error code when the stream broke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Error message when the stream broke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LlmResponse {
    /// A partial response carrying one text delta.
    #[must_use]
    pub fn text_delta(delta: impl Into<String>, turn_complete: bool) -> Self {
        Self {
            content: vec![ContentPart::text(delta)],
            partial: true,
            turn_complete,
            ..Self::default()
        }
    }

    /// A response reporting a backend failure.
    ///
    /// Connectivity failures are classified into the `MCP_*` codes; anything
    /// else keeps the provider's code. The message is always a fixed sentence.
    #[must_use]
    pub fn from_provider_error(error: &ProviderError) -> Self {
        let (code, message) = error.failure();
        Self {
            turn_complete: true,
            error_code: Some(code),
            error_message: Some(message),
            ..Self::default()
        }
    }

    /// Concatenated text of every text part.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect()
    }

    /// Convert into a runtime event attributed to `author`.
    ///
    /// A non-partial response that stopped for any reason other than
    /// [`FinishReason::Stop`] carries that reason as its error code, so a
    /// truncated or filtered answer fails the turn.
    #[must_use]
    pub fn into_execution_event(
        self,
        author: impl Into<String>,
        invocation_id: impl Into<String>,
    ) -> ExecutionEvent {
        let error_code = self.error_code.or_else(|| {
            self.finish_reason
                .filter(|reason| !self.partial && *reason != FinishReason::Stop)
                .map(|reason| reason.as_code().to_owned())
        });
        ExecutionEvent {
            author: author.into(),
            invocation_id: invocation_id.into(),
            partial: self.partial,
            content: self.content,
            long_running_ids: Vec::new(),
            error_code,
            error_message: self.error_message,
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }
}

impl ErrorCarrier for LlmResponse {
    fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

impl ToolContentCarrier for LlmResponse {
    fn parts(&self) -> &[ContentPart] {
        &self.content
    }
}
