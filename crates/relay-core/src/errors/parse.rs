//! Transport error classification.
//!
//! Matches raw error text from tool transports (MCP servers, HTTP backends)
//! against known connectivity patterns. A match maps to one of the `MCP_*`
//! codes and a fixed, actionable sentence. The raw text is never part of the
//! user-facing message.

use serde::{Deserialize, Serialize};

/// Connectivity failure kinds with dedicated user guidance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportErrorKind {
    /// Timed out reaching or waiting on a tool server.
    #[serde(rename = "MCP_CONNECTION_ERROR")]
    Timeout,
    /// Tool server host name could not be resolved.
    #[serde(rename = "MCP_DNS_ERROR")]
    Dns,
    /// Tool server actively refused the connection.
    #[serde(rename = "MCP_CONNECTION_REFUSED")]
    ConnectionRefused,
}

impl TransportErrorKind {
    /// Wire error code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Timeout => "MCP_CONNECTION_ERROR",
            Self::Dns => "MCP_DNS_ERROR",
            Self::ConnectionRefused => "MCP_CONNECTION_REFUSED",
        }
    }

    /// Fixed user-facing guidance.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::ConnectionRefused => {
                "The tool server refused the connection. Check that the server is running \
                 and listening on the configured address."
            }
            Self::Dns => {
                "The tool server address could not be resolved. Check the server URL and \
                 your DNS configuration."
            }
            Self::Timeout => {
                "Timed out while communicating with the tool server. The server may be \
                 overloaded or unreachable; try again shortly."
            }
        }
    }
}

struct TransportPattern {
    check: fn(&str) -> bool,
    kind: TransportErrorKind,
}

/// Known patterns, checked in order against lowercased text.
fn patterns() -> &'static [TransportPattern] {
    static PATTERNS: &[TransportPattern] = &[
        TransportPattern {
            check: |s| s.contains("connection refused") || s.contains("econnrefused"),
            kind: TransportErrorKind::ConnectionRefused,
        },
        TransportPattern {
            check: |s| {
                s.contains("no such host")
                    || s.contains("failed to lookup address")
                    || s.contains("name resolution")
                    || s.contains("name or service not known")
                    || s.contains("enotfound")
                    || s.contains("dns error")
            },
            kind: TransportErrorKind::Dns,
        },
        TransportPattern {
            check: |s| {
                s.contains("timed out")
                    || s.contains("timeout")
                    || s.contains("deadline exceeded")
                    || s.contains("etimedout")
            },
            kind: TransportErrorKind::Timeout,
        },
    ];
    PATTERNS
}

/// Classify raw error text into a transport failure kind.
///
/// Returns `None` when no connectivity pattern matches.
#[must_use]
pub fn classify_transport_error(raw: &str) -> Option<TransportErrorKind> {
    let lower = raw.to_lowercase();
    patterns()
        .iter()
        .find(|pattern| (pattern.check)(&lower))
        .map(|pattern| pattern.kind)
}
