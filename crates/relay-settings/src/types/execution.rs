use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits applied to one agent turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionSettings {
    /// Budget for consuming the runtime stream, independent of the caller.
    pub timeout_ms: u64,
    /// Budget for each detached session-append call.
    pub session_append_timeout_ms: u64,
    /// Maximum characters of a derived session name before the ellipsis.
    pub session_name_max_chars: usize,
    /// Capacity of the queue between the runtime producer and the loop.
    pub event_queue_capacity: usize,
}

impl ExecutionSettings {
    /// [`timeout_ms`](Self::timeout_ms) as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// [`session_append_timeout_ms`](Self::session_append_timeout_ms) as a [`Duration`].
    pub fn session_append_timeout(&self) -> Duration {
        Duration::from_millis(self.session_append_timeout_ms)
    }
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 600_000,
            session_append_timeout_ms: 10_000,
            session_name_max_chars: 20,
            event_queue_capacity: 64,
        }
    }
}
