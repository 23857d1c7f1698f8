//! Structured logging setup on the `tracing` ecosystem.
//!
//! Execution context (task ID, context ID, session ID) travels on spans
//! opened by the executor rather than being threaded through every call.
//!
//! - [`init_subscriber`]: human-readable stderr output
//! - [`init_json_subscriber`]: newline-delimited JSON for log shippers
//! - [`capture_logs`]: in-memory capture for tests

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, CapturedSpan, capture_logs};

use tracing_subscriber::EnvFilter;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global tracing subscriber with compact stderr output.
///
/// `RUST_LOG` overrides `level` when set. Subsequent calls are no-ops.
pub fn init_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // no-op if a global default is already set
    let _ = subscriber.try_init();
}

/// Initialize the global tracing subscriber with JSON lines on stderr.
///
/// Span fields are flattened into each line so `task_id` and friends are
/// searchable. Subsequent calls are no-ops.
pub fn init_json_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .flatten_event(true)
        .with_current_span(true);

    let _ = subscriber.try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
