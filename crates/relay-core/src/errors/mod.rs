//! Error taxonomy shared across the bridge.
//!
//! - [`codes`]: canonical runtime error codes and their user-facing sentences
//! - [`parse`]: classification of raw transport error text into `MCP_*` codes
//!
//! Both tables are process-wide, immutable, and need no locking.

pub mod codes;
pub mod parse;

pub use codes::{ErrorCode, GENERIC_ERROR_MESSAGE, user_message_for};
pub use parse::{TransportErrorKind, classify_transport_error};

/// Resolve the user-facing message for a failed event.
///
/// Known codes map to their fixed sentence. Unknown codes pass through the
/// backend message when one is present, otherwise fall back to
/// [`GENERIC_ERROR_MESSAGE`].
#[must_use]
pub fn failure_message(code: &str, backend_message: Option<&str>) -> String {
    if let Some(known) = ErrorCode::parse(code) {
        return known.user_message().to_owned();
    }
    match backend_message.map(str::trim) {
        Some(msg) if !msg.is_empty() => msg.to_owned(),
        _ => GENERIC_ERROR_MESSAGE.to_owned(),
    }
}
