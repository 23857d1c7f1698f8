//! # Tool Call Argument Parsing
//!
//! Fail-open JSON parsing for accumulated tool-call argument buffers.
//! Malformed or truncated arguments degrade to an empty map so one bad call
//! never aborts the whole response.

use serde_json::{Map, Value};
use tracing::warn;

/// Correlation fields attached to parse-failure warnings.
#[derive(Clone, Copy, Debug, Default)]
pub struct ToolCallContext<'a> {
    /// The tool call ID.
    pub tool_call_id: Option<&'a str>,
    /// The tool name.
    pub tool_name: Option<&'a str>,
    /// Stream index the call was accumulated under.
    pub index: Option<u32>,
}

/// Parse a tool-call argument buffer into a JSON object.
///
/// Empty input is an empty map. Anything that isn't a JSON object logs a
/// warning and yields an empty map.
pub fn parse_tool_call_arguments(args: &str, context: ToolCallContext<'_>) -> Map<String, Value> {
    let trimmed = args.trim();
    if trimmed.is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(
                tool_call_id = context.tool_call_id,
                tool_name = context.tool_name,
                index = context.index,
                parsed_type = json_type_name(&other),
                "tool call arguments are not an object, using empty arguments"
            );
            Map::new()
        }
        Err(e) => {
            warn!(
                tool_call_id = context.tool_call_id,
                tool_name = context.tool_name,
                index = context.index,
                error = %e,
                args_preview = %relay_core::text::truncate_with_ellipsis(trimmed, 100),
                "failed to parse tool call arguments, using empty arguments"
            );
            Map::new()
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
