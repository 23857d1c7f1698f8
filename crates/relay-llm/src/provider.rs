//! # Chat Backend Trait
//!
//! Core abstraction for chat-completion backends. The assembler talks to a
//! backend only through [`ChatBackend`], so tests can script one without HTTP.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use relay_core::errors::{GENERIC_ERROR_MESSAGE, classify_transport_error};

use crate::openai::types::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse};

/// Result type alias for backend operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Boxed stream of delta frames returned by [`ChatBackend::complete_stream`].
pub type ChunkStream = Pin<Box<dyn Stream<Item = ProviderResult<ChatCompletionChunk>> + Send>>;

/// Errors that can occur while talking to a backend.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SSE stream could not be read.
    #[error("SSE stream error: {message}")]
    SseParse {
        /// Error description.
        message: String,
    },

    /// Authentication failed (missing or rejected key).
    #[error("Auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// Rate limited by the backend.
    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested retry delay in milliseconds.
        retry_after_ms: u64,
        /// Error description.
        message: String,
    },

    /// Backend returned an API error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Backend-specific error code.
        code: Option<String>,
    },

    /// Stream was cancelled by the caller.
    #[error("Stream cancelled")]
    Cancelled,

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl ProviderError {
    /// Whether this is caller-side cancellation rather than a backend fault.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Error category string for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) | Self::SseParse { .. } => "parse",
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limit",
            Self::Api { .. } => "api",
            Self::Cancelled => "cancelled",
            Self::Other { .. } => "unknown",
        }
    }

    /// Error code carried on failed responses.
    ///
    /// Backend-supplied API codes are upper-cased; everything else is derived
    /// from the category (`NETWORK_ERROR`, `PARSE_ERROR`, ...).
    pub fn error_code(&self) -> String {
        match self {
            Self::Api {
                code: Some(code), ..
            } if !code.is_empty() => code.to_uppercase(),
            _ => format!("{}_ERROR", self.category().to_uppercase()),
        }
    }

    /// Fixed user-facing sentence for this failure. Never includes provider
    /// text.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Http(_) => "The model service could not be reached. Please try again.",
            Self::Json(_) | Self::SseParse { .. } => {
                "The model service returned a response that could not be read."
            }
            Self::Auth { .. } => "The model service rejected the configured credentials.",
            Self::RateLimited { .. } => {
                "The model service is receiving too many requests. Please try again shortly."
            }
            Self::Api { .. } => "The model service returned an error. Please try again.",
            Self::Cancelled => "The model request was cancelled.",
            Self::Other { .. } => GENERIC_ERROR_MESSAGE,
        }
    }

    /// Error code and user-facing message for a failed turn.
    ///
    /// Connectivity failures map to the `MCP_*` codes; everything else keeps
    /// [`error_code`](Self::error_code) with [`user_message`](Self::user_message).
    pub fn failure(&self) -> (String, String) {
        match classify_transport_error(&self.to_string()) {
            Some(kind) => (kind.code().to_owned(), kind.user_message().to_owned()),
            None => (self.error_code(), self.user_message().to_owned()),
        }
    }
}

/// A chat-completion backend.
///
/// Implementors must be `Send + Sync` so one backend can serve many
/// concurrent turns.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Default model ID used when a request does not name one.
    fn model(&self) -> &str;

    /// Issue one non-streaming completion.
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> ProviderResult<ChatCompletionResponse>;

    /// Issue a streaming completion and return its delta frames.
    async fn complete_stream(&self, request: &ChatCompletionRequest)
    -> ProviderResult<ChunkStream>;
}
