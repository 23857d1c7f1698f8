//! # Response Assembler
//!
//! Drives one backend call and reduces it to canonical [`LlmResponse`]s.
//!
//! Non-streaming: exactly one final response.
//!
//! Streaming:
//! - one partial response per text delta, as it arrives
//! - tool-call fragments accumulated by stream index
//! - at EOF or cancellation, one final non-partial response (full text,
//!   then tool calls in ascending index order)
//! - a mid-stream backend error ends the stream with one error-carrying
//!   response instead of an `Err` item
//!
//! The returned stream is lazy: nothing is sent until it is first polled,
//! and frames are pulled from the backend only as fast as the caller pulls
//! responses.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::openai::message_converter::build_chat_request;
use crate::openai::stream_handler::{
    StreamState, convert_response, finalize_stream, process_chunk,
};
use crate::provider::{ChatBackend, ProviderResult};
use crate::request::LlmRequest;
use crate::response::LlmResponse;

/// Lazy, finite stream of assembled responses.
///
/// Items are `Err` only when the backend call could not be issued.
pub type LlmResponseStream = Pin<Box<dyn Stream<Item = ProviderResult<LlmResponse>> + Send>>;

/// Reduces backend output to canonical responses.
#[derive(Clone)]
pub struct ResponseAssembler {
    backend: Arc<dyn ChatBackend>,
}

impl ResponseAssembler {
    /// Create an assembler over `backend`.
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Generate responses for `request`.
    pub fn generate(&self, request: LlmRequest, streaming: bool) -> LlmResponseStream {
        self.generate_with_cancel(request, streaming, CancellationToken::new())
    }

    /// Generate responses for `request`, stopping early when `cancel` fires.
    ///
    /// Cancellation is not an error: the stream finalizes with whatever was
    /// accumulated so far.
    pub fn generate_with_cancel(
        &self,
        request: LlmRequest,
        streaming: bool,
        cancel: CancellationToken,
    ) -> LlmResponseStream {
        let backend = Arc::clone(&self.backend);
        if streaming {
            Box::pin(stream_responses(backend, request, cancel))
        } else {
            Box::pin(single_response(backend, request))
        }
    }
}

fn single_response(
    backend: Arc<dyn ChatBackend>,
    request: LlmRequest,
) -> impl Stream<Item = ProviderResult<LlmResponse>> + Send {
    async_stream::stream! {
        let wire = build_chat_request(&request, backend.model(), false);
        match backend.complete(&wire).await {
            Ok(response) => yield Ok(convert_response(response)),
            Err(e) => {
                warn!(error = %e, category = e.category(), "chat completion failed");
                yield Err(e);
            }
        }
    }
}

fn stream_responses(
    backend: Arc<dyn ChatBackend>,
    request: LlmRequest,
    cancel: CancellationToken,
) -> impl Stream<Item = ProviderResult<LlmResponse>> + Send {
    async_stream::stream! {
        let wire = build_chat_request(&request, backend.model(), true);
        let mut frames = match backend.complete_stream(&wire).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(error = %e, category = e.category(), "chat completion stream failed to start");
                yield Err(e);
                return;
            }
        };

        let mut state = StreamState::default();
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(frames = state.frames, "stream cancelled, finalizing");
                    break;
                }
                next = frames.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    for partial in process_chunk(&chunk, &mut state) {
                        yield Ok(partial);
                    }
                }
                Some(Err(e)) if e.is_cancellation() => {
                    debug!(frames = state.frames, "backend reported cancellation, finalizing");
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, category = e.category(), frames = state.frames, "stream broke mid-response");
                    yield Ok(LlmResponse::from_provider_error(&e));
                    return;
                }
                None => break,
            }
        }

        log_final(&state);
        yield Ok(finalize_stream(state));
    }
}

fn log_final(state: &StreamState) {
    debug!(
        frames = state.frames,
        text_len = state.text.len(),
        tool_calls = state.tool_calls.len(),
        finish_reason = ?state.finish_reason,
        "stream complete"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
