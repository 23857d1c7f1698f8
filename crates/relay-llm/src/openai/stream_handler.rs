//! # Stream Handler
//!
//! Delta-frame state machine for chat-completions streams.
//!
//! - text deltas → one partial [`LlmResponse`] each, appended to the running text
//! - tool-call deltas → accumulated per stream index (id/name first non-empty
//!   wins, argument fragments appended in arrival order)
//! - finish reasons → latest value wins
//! - usage → taken from the trailing usage frame
//!
//! [`finalize_stream`] builds the single non-partial response: full text
//! first, then tool calls in ascending index order.

use std::collections::BTreeMap;

use relay_core::content::ContentPart;
use relay_core::events::{FinishReason, UsageMetadata};
use tracing::debug;

use super::types::{ChatCompletionChunk, ChatCompletionResponse, ToolCallDelta, Usage};
use crate::response::LlmResponse;
use crate::tool_parsing::{ToolCallContext, parse_tool_call_arguments};

/// One tool call being accumulated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolCallAccumulator {
    /// Call ID.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Raw argument fragments, concatenated in arrival order.
    pub arguments: String,
}

impl ToolCallAccumulator {
    fn apply(&mut self, delta: &ToolCallDelta) {
        if self.id.is_empty() {
            if let Some(id) = delta.id.as_deref().filter(|s| !s.is_empty()) {
                id.clone_into(&mut self.id);
            }
        }
        if let Some(function) = &delta.function {
            if self.name.is_empty() {
                if let Some(name) = function.name.as_deref().filter(|s| !s.is_empty()) {
                    name.clone_into(&mut self.name);
                }
            }
            if let Some(fragment) = &function.arguments {
                self.arguments.push_str(fragment);
            }
        }
    }

    fn into_part(self, index: u32) -> ContentPart {
        let id = if self.id.is_empty() {
            debug!(index, name = %self.name, "tool call without id, synthesizing one");
            format!("call_{index}")
        } else {
            self.id
        };
        let args = parse_tool_call_arguments(
            &self.arguments,
            ToolCallContext {
                tool_call_id: Some(id.as_str()),
                tool_name: Some(self.name.as_str()),
                index: Some(index),
            },
        );
        ContentPart::function_call(id, self.name, args)
    }
}

/// State accumulated across the frames of one stream.
#[derive(Clone, Debug, Default)]
pub struct StreamState {
    /// Full text so far.
    pub text: String,
    /// Tool calls keyed by stream index.
    pub tool_calls: BTreeMap<u32, ToolCallAccumulator>,
    /// Latest finish reason seen.
    pub finish_reason: Option<FinishReason>,
    /// Usage from the trailing frame.
    pub usage: Option<UsageMetadata>,
    /// Number of frames processed.
    pub frames: usize,
}

/// Map a raw finish reason onto the canonical set.
///
/// `length` → `MaxTokens`, `content_filter` → `Safety`, everything else
/// (including `tool_calls` and unknown values) → `Stop`.
#[must_use]
pub fn map_finish_reason(raw: &str) -> FinishReason {
    match raw {
        "length" => FinishReason::MaxTokens,
        "content_filter" => FinishReason::Safety,
        _ => FinishReason::Stop,
    }
}

fn convert_usage(usage: Usage) -> UsageMetadata {
    UsageMetadata {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

/// Apply one frame and return the partial responses it produces.
///
/// Only choice 0 is consumed. A frame yields at most one partial response:
/// its text delta, marked `turn_complete` when the same frame carries a
/// finish reason.
pub fn process_chunk(chunk: &ChatCompletionChunk, state: &mut StreamState) -> Vec<LlmResponse> {
    state.frames += 1;
    if let Some(usage) = chunk.usage {
        state.usage = Some(convert_usage(usage));
    }

    let Some(choice) = chunk.choices.iter().find(|c| c.index == 0) else {
        return Vec::new();
    };

    for delta in &choice.delta.tool_calls {
        state.tool_calls.entry(delta.index).or_default().apply(delta);
    }

    let finished = match choice.finish_reason.as_deref().filter(|r| !r.is_empty()) {
        Some(raw) => {
            state.finish_reason = Some(map_finish_reason(raw));
            true
        }
        None => false,
    };

    match choice.delta.content.as_deref().filter(|t| !t.is_empty()) {
        Some(delta) => {
            state.text.push_str(delta);
            vec![LlmResponse::text_delta(delta, finished)]
        }
        None => Vec::new(),
    }
}

/// Build the single final, non-partial response from accumulated state.
#[must_use]
pub fn finalize_stream(state: StreamState) -> LlmResponse {
    let mut content = Vec::with_capacity(state.tool_calls.len() + 1);
    if !state.text.is_empty() {
        content.push(ContentPart::text(state.text));
    }
    content.extend(
        state
            .tool_calls
            .into_iter()
            .map(|(index, acc)| acc.into_part(index)),
    );

    LlmResponse {
        content,
        partial: false,
        turn_complete: true,
        finish_reason: Some(state.finish_reason.unwrap_or(FinishReason::Stop)),
        usage: state.usage,
        error_code: None,
        error_message: None,
    }
}

/// Convert a non-streaming response into one final response.
#[must_use]
pub fn convert_response(response: ChatCompletionResponse) -> LlmResponse {
    let usage = response.usage.map(convert_usage);
    let Some(choice) = response.choices.into_iter().next() else {
        return LlmResponse {
            turn_complete: true,
            finish_reason: Some(FinishReason::Stop),
            usage,
            ..LlmResponse::default()
        };
    };

    let mut content = Vec::with_capacity(choice.message.tool_calls.len() + 1);
    if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
        content.push(ContentPart::text(text));
    }
    for (index, call) in (0u32..).zip(choice.message.tool_calls) {
        let acc = ToolCallAccumulator {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        };
        content.push(acc.into_part(index));
    }

    LlmResponse {
        content,
        partial: false,
        turn_complete: true,
        finish_reason: Some(
            choice
                .finish_reason
                .as_deref()
                .map_or(FinishReason::Stop, map_finish_reason),
        ),
        usage,
        error_code: None,
        error_message: None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
