//! Shared constants.

/// Name of the internal function call the runtime emits when a tool needs
/// end-user credentials. Treated as an auth interrupt, never as an approval.
pub const REQUEST_CREDENTIAL_FUNCTION_NAME: &str = "adk_request_credential";

/// The sole error code that means normal completion.
pub const NORMAL_COMPLETION_CODE: &str = "STOP";

/// Metadata key: application name.
pub const META_APP_NAME: &str = "app_name";
/// Metadata key: user ID.
pub const META_USER_ID: &str = "user_id";
/// Metadata key: session ID.
pub const META_SESSION_ID: &str = "session_id";
/// Metadata key: canonical error code on failed events.
pub const META_ERROR_CODE: &str = "error_code";
/// Metadata key: marks a live-display fragment.
pub const META_PARTIAL: &str = "partial";
/// Metadata key: event author.
pub const META_AUTHOR: &str = "author";
/// Metadata key: runtime invocation ID.
pub const META_INVOCATION_ID: &str = "invocation_id";

/// Part metadata key: canonical part kind (`function_call`, ...).
pub const PART_META_TYPE: &str = "type";
/// Part metadata key: set on function calls awaiting out-of-band completion.
pub const PART_META_LONG_RUNNING: &str = "is_long_running";

/// Data-part `interrupt_type` value for tool approval prompts.
pub const INTERRUPT_TOOL_APPROVAL: &str = "tool_approval";
