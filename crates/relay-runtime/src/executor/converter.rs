//! Conversion between runtime events and protocol parts.

use relay_core::constants::REQUEST_CREDENTIAL_FUNCTION_NAME;
use relay_core::content::ContentPart;
use relay_core::events::ExecutionEvent;
use relay_core::protocol::{Message, Part, TaskState};
use tracing::warn;

/// A runtime event converted for the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertedEvent {
    /// State implied by the event's long-running calls.
    pub state: TaskState,
    /// Agent message carrying the converted parts.
    pub message: Message,
    /// Whether any part is something other than plain text.
    pub carries_tool_content: bool,
}

/// Decode inbound wire parts. Malformed typed parts are logged and dropped.
pub fn decode_inbound(message: &Message) -> Vec<ContentPart> {
    message
        .parts
        .iter()
        .filter_map(|part| match part.to_content_part() {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "dropping malformed inbound part");
                None
            }
        })
        .collect()
}

/// Convert a runtime event. `None` when it has no content.
///
/// A long-running credential request implies `AuthRequired`; any other
/// long-running call implies `InputRequired`; everything else is `Working`.
pub fn convert_event(event: &ExecutionEvent) -> Option<ConvertedEvent> {
    if event.content.is_empty() {
        return None;
    }

    let mut state = TaskState::Working;
    let mut carries_tool_content = false;
    let mut parts = Vec::with_capacity(event.content.len());
    for part in &event.content {
        let long_running = match part {
            ContentPart::Text { .. } => false,
            ContentPart::FunctionCall { id, name, .. } => {
                let long_running = event.is_long_running(id);
                if long_running {
                    state = if name == REQUEST_CREDENTIAL_FUNCTION_NAME {
                        TaskState::AuthRequired
                    } else if state == TaskState::AuthRequired {
                        state
                    } else {
                        TaskState::InputRequired
                    };
                }
                long_running
            }
            _ => false,
        };
        carries_tool_content |= !matches!(part, ContentPart::Text { .. });
        parts.push(Part::from_content_part(part, long_running));
    }

    Some(ConvertedEvent {
        state,
        message: Message::agent(parts),
        carries_tool_content,
    })
}
