//! # Message Converter
//!
//! Canonical [`LlmRequest`] to chat-completions request.
//!
//! - System instruction → leading `system` message
//! - Model turns → one `assistant` message (joined text + `tool_calls`)
//! - Function responses → `tool` messages, emitted before any user text of
//!   the same turn so they directly follow the assistant's calls
//! - Code parts → fenced text

use relay_core::content::ContentPart;

use super::types::{
    ChatCompletionRequest, ChatMessage, ChatRole, FunctionCall, FunctionDefinition,
    StreamOptions, ToolCall, ToolDefinition,
};
use crate::request::{Content, ContentRole, FunctionDeclaration, LlmRequest};

/// Build the wire request.
///
/// `default_model` is used when the request names none. Streaming requests
/// ask for a trailing usage frame.
#[must_use]
pub fn build_chat_request(
    request: &LlmRequest,
    default_model: &str,
    streaming: bool,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: request
            .model
            .clone()
            .unwrap_or_else(|| default_model.to_owned()),
        messages: convert_messages(request),
        tools: convert_tools(&request.tools),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream: streaming,
        stream_options: streaming.then_some(StreamOptions {
            include_usage: true,
        }),
    }
}

/// Convert the system instruction and every turn into wire messages.
#[must_use]
pub fn convert_messages(request: &LlmRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    if let Some(system) = request
        .system_instruction
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        messages.push(ChatMessage::text(ChatRole::System, system));
    }
    for content in &request.contents {
        convert_content(content, &mut messages);
    }
    messages
}

fn convert_content(content: &Content, out: &mut Vec<ChatMessage>) {
    let mut text = Vec::new();
    let mut tool_calls = Vec::new();

    for part in &content.parts {
        match part {
            ContentPart::Text { text: t } => text.push(t.clone()),
            ContentPart::FunctionCall { id, name, args } => tool_calls.push(ToolCall {
                id: id.clone(),
                call_type: "function".into(),
                function: FunctionCall {
                    name: name.clone(),
                    arguments: serde_json::Value::Object(args.clone()).to_string(),
                },
            }),
            ContentPart::FunctionResponse { id, response, .. } => out.push(
                ChatMessage::tool_result(id, serde_json::Value::Object(response.clone()).to_string()),
            ),
            ContentPart::ExecutableCode { code, language } => {
                text.push(format!("```{}\n{code}\n```", language.to_lowercase()));
            }
            ContentPart::CodeExecutionResult { outcome, output } => {
                text.push(format!("Code execution result ({outcome}):\n```\n{output}\n```"));
            }
        }
    }

    let body = (!text.is_empty()).then(|| text.join("\n"));
    match content.role {
        ContentRole::Model if body.is_some() || !tool_calls.is_empty() => {
            out.push(ChatMessage {
                role: ChatRole::Assistant,
                content: body,
                tool_calls,
                tool_call_id: None,
            });
        }
        ContentRole::User => {
            if let Some(body) = body {
                out.push(ChatMessage::text(ChatRole::User, body));
            }
        }
        ContentRole::Model => {}
    }
}

/// Convert function declarations into wire tool definitions.
#[must_use]
pub fn convert_tools(tools: &[FunctionDeclaration]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .map(|t| ToolDefinition {
            tool_type: "function".into(),
            function: FunctionDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: if t.parameters.is_null() {
                    serde_json::json!({"type": "object", "properties": {}})
                } else {
                    t.parameters.clone()
                },
            },
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
