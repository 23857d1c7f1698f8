//! # SSE Parser
//!
//! Server-Sent Events line parser for chat-completion streams.
//!
//! Buffers incoming bytes, splits on newlines, extracts `data:` payloads and
//! drops `[DONE]` markers, comments, and non-data fields. A read error from
//! the underlying byte stream is yielded once and ends the stream, so callers
//! can tell a broken connection apart from a clean EOF.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

/// Parse SSE lines from a byte stream and yield the raw `data:` payloads.
///
/// Trailing buffer content without a final newline is still processed at EOF.
pub fn parse_sse_lines<S, E>(byte_stream: S) -> impl Stream<Item = Result<String, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send + 'static,
{
    futures::stream::unfold(
        (byte_stream, BytesMut::with_capacity(8192), false),
        |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let Ok(line) = std::str::from_utf8(&line_bytes) else {
                        continue;
                    };

                    if let Some(data) = extract_sse_data(line) {
                        return Some((Ok(data), (stream, buffer, false)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        warn!(error = %e, "SSE stream read error");
                        return Some((Err(e), (stream, buffer, true)));
                    }
                    None => {
                        if buffer.is_empty() {
                            return None;
                        }
                        let data = std::str::from_utf8(&buffer)
                            .ok()
                            .and_then(|rest| extract_sse_data(rest.trim()));
                        buffer.clear();
                        return data.map(|d| (Ok(d), (stream, buffer, true)));
                    }
                }
            }
        },
    )
}

/// Extract the data payload from one SSE line.
///
/// Returns `None` for comments, empty lines, other fields, empty data, and
/// the `[DONE]` marker.
fn extract_sse_data(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?
        .trim();

    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_owned())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
