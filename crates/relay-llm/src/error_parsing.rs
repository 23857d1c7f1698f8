//! API error response parsing.
//!
//! Handles the envelope shapes OpenAI-compatible servers return:
//! - Standard: `{"error": {"message": "...", "type": "...", "code": "..."}}`
//! - Detail:   `{"detail": "..."}`
//! - Flat:     `{"message": "...", "code": "..."}`

use serde_json::Value;

use crate::provider::ProviderError;

/// Parsed API error information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiErrorInfo {
    /// Human-readable error message.
    pub message: String,
    /// Backend-specific error code.
    pub code: Option<String>,
}

/// Parse an API error body, falling back to the raw text.
pub fn parse_api_error(body: &str, status: u16) -> ApiErrorInfo {
    let raw = || ApiErrorInfo {
        message: format!("HTTP {status}: {body}"),
        code: None,
    };

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return raw();
    };

    if let Some(msg) = json["error"]["message"].as_str() {
        let code = json["error"]["code"]
            .as_str()
            .or_else(|| json["error"]["type"].as_str())
            .map(String::from);
        return ApiErrorInfo {
            message: msg.to_owned(),
            code,
        };
    }

    if let Some(msg) = json["detail"].as_str().or_else(|| json["message"].as_str()) {
        let code = json["code"]
            .as_str()
            .or_else(|| json["type"].as_str())
            .map(String::from);
        return ApiErrorInfo {
            message: msg.to_owned(),
            code,
        };
    }

    raw()
}

/// Build the [`ProviderError`] for a non-success HTTP response.
///
/// 401/403 become [`ProviderError::Auth`], 429 becomes
/// [`ProviderError::RateLimited`], everything else [`ProviderError::Api`].
pub fn error_for_status(status: u16, body: &str, retry_after_ms: Option<u64>) -> ProviderError {
    let info = parse_api_error(body, status);
    match status {
        401 | 403 => ProviderError::Auth {
            message: info.message,
        },
        429 => ProviderError::RateLimited {
            retry_after_ms: retry_after_ms.unwrap_or(0),
            message: info.message,
        },
        _ => ProviderError::Api {
            status,
            message: info.message,
            code: info.code,
        },
    }
}

/// Parse a `retry-after` header value given in whole seconds.
pub fn parse_retry_after_secs(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().map(|s| s.saturating_mul(1000))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
