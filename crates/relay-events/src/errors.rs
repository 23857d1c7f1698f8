//! Error types for session operations.

use thiserror::Error;

/// Errors that can occur while reading or writing session history.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Requested session was not found.
    #[error("session not found: {0}")]
    NotFound(String),

    /// A session with this id already exists.
    #[error("session already exists: {0}")]
    AlreadyExists(String),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Backend storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl SessionError {
    /// Short category label for logs and metrics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "conflict",
            Self::Serde(_) => "serde",
            Self::Storage(_) => "storage",
        }
    }
}

/// Convenience type alias for session results.
pub type Result<T> = std::result::Result<T, SessionError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
