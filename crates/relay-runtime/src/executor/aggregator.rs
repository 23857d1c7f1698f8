//! Task aggregator.
//!
//! Folds the non-partial outbound events of one turn into a single outcome.
//!
//! Dominance, strongest first:
//!
//! | observed          | effect                                           |
//! |-------------------|--------------------------------------------------|
//! | `Failed`          | always recorded, message replaced                |
//! | `AuthRequired`    | recorded unless `Failed`                         |
//! | `InputRequired`   | recorded unless `Failed` or `AuthRequired`       |
//! | anything else     | parts accumulated only while still `Working`     |
//!
//! Once the state leaves `Working`, accumulation stops for good.

use relay_core::protocol::{Message, Part, TaskState};

/// How a turn ended, as decided by the aggregator.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    /// Output was produced: emit it as the final artifact, then `Completed`.
    Completed {
        /// Accumulated parts, in arrival order.
        parts: Vec<Part>,
    },
    /// The runtime ended without producing anything.
    Unexpected,
    /// An interrupt or failure state, surfaced as the final status.
    Status {
        /// Final state.
        state: TaskState,
        /// Status message, if any was recorded.
        message: Option<Message>,
        /// Error code of the failure, for `Failed`.
        error_code: Option<String>,
    },
}

impl TurnOutcome {
    /// The terminal or interrupted state this outcome reports.
    pub fn state(&self) -> TaskState {
        match self {
            Self::Completed { .. } => TaskState::Completed,
            Self::Unexpected => TaskState::Failed,
            Self::Status { state, .. } => *state,
        }
    }
}

/// Per-turn fold over non-partial outbound events.
#[derive(Debug)]
pub struct TaskAggregator {
    state: TaskState,
    message: Option<Message>,
    error_code: Option<String>,
    parts: Vec<Part>,
}

impl Default for TaskAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskAggregator {
    /// Start a turn in `Working`.
    pub fn new() -> Self {
        Self {
            state: TaskState::Working,
            message: None,
            error_code: None,
            parts: Vec::new(),
        }
    }

    /// Current aggregate state.
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Parts accumulated so far.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Fold one non-partial status.
    pub fn observe(&mut self, state: TaskState, message: Option<Message>) {
        match state {
            TaskState::Failed => {
                self.state = TaskState::Failed;
                self.message = message;
            }
            TaskState::AuthRequired if self.state != TaskState::Failed => {
                self.state = TaskState::AuthRequired;
                self.message = message;
            }
            TaskState::InputRequired
                if !matches!(self.state, TaskState::Failed | TaskState::AuthRequired) =>
            {
                self.state = TaskState::InputRequired;
                self.message = message;
            }
            TaskState::AuthRequired | TaskState::InputRequired => {}
            _ if self.state == TaskState::Working => {
                if let Some(message) = message {
                    self.parts.extend(message.parts.iter().cloned());
                    self.message = Some(message);
                }
            }
            _ => {}
        }
    }

    /// Fold a failure, remembering its error code.
    pub fn observe_failure(&mut self, error_code: impl Into<String>, message: Message) {
        self.observe(TaskState::Failed, Some(message));
        self.error_code = Some(error_code.into());
    }

    /// Decide the outcome of the turn.
    pub fn finish(self) -> TurnOutcome {
        match self.state {
            TaskState::Working | TaskState::Submitted if !self.parts.is_empty() => {
                TurnOutcome::Completed { parts: self.parts }
            }
            TaskState::Working | TaskState::Submitted => TurnOutcome::Unexpected,
            state => TurnOutcome::Status {
                state,
                message: self.message,
                error_code: self.error_code,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
