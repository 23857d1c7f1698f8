//! Canonical runtime error codes.
//!
//! The table only grows: new codes get new rows, existing codes never change
//! meaning. `STOP` is normal completion and has no row.

use serde::{Deserialize, Serialize};

/// Fallback sentence for codes without a table entry.
pub const GENERIC_ERROR_MESSAGE: &str =
    "An error occurred while processing your request. Please try again.";

/// Known runtime error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Output token limit reached.
    MaxTokens,
    /// Blocked by safety filters.
    Safety,
    /// Blocked for reciting training data.
    Recitation,
    /// Blocked by a term blocklist.
    Blocklist,
    /// Prohibited content detected.
    ProhibitedContent,
    /// Sensitive personally identifiable information detected.
    Spii,
    /// The model produced an invalid function call.
    MalformedFunctionCall,
    /// Unspecified backend failure.
    Other,
}

impl ErrorCode {
    /// Every known code, in table order.
    pub const ALL: [Self; 8] = [
        Self::MaxTokens,
        Self::Safety,
        Self::Recitation,
        Self::Blocklist,
        Self::ProhibitedContent,
        Self::Spii,
        Self::MalformedFunctionCall,
        Self::Other,
    ];

    /// Parse a wire code. Returns `None` for unknown codes and for `STOP`.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }

    /// Wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MaxTokens => "MAX_TOKENS",
            Self::Safety => "SAFETY",
            Self::Recitation => "RECITATION",
            Self::Blocklist => "BLOCKLIST",
            Self::ProhibitedContent => "PROHIBITED_CONTENT",
            Self::Spii => "SPII",
            Self::MalformedFunctionCall => "MALFORMED_FUNCTION_CALL",
            Self::Other => "OTHER",
        }
    }

    /// Fixed user-facing sentence.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::MaxTokens => {
                "The response was cut off because it reached the maximum token limit."
            }
            Self::Safety => "The response was blocked by safety filters.",
            Self::Recitation => {
                "The response was blocked because it closely matched existing content."
            }
            Self::Blocklist => "The response was blocked because it contained blocked terms.",
            Self::ProhibitedContent => {
                "The response was blocked because it contained prohibited content."
            }
            Self::Spii => {
                "The response was blocked because it contained sensitive personal information."
            }
            Self::MalformedFunctionCall => {
                "The model produced an invalid tool call. Please try rephrasing your request."
            }
            Self::Other => "The model stopped for an unspecified reason.",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing sentence for a wire code, or the generic fallback.
#[must_use]
pub fn user_message_for(code: &str) -> &'static str {
    ErrorCode::parse(code).map_or(GENERIC_ERROR_MESSAGE, ErrorCode::user_message)
}
