//! The agent runtime seam.
//!
//! The planner that decides when to call tools and what to ask the model
//! lives behind [`AgentRuntime`]. The executor hands it one [`RunRequest`]
//! per turn and consumes the event stream it returns.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use relay_core::content::ContentPart;
use relay_core::events::ExecutionEvent;
use relay_events::Session;

use crate::errors::RuntimeError;
use crate::hitl::ApprovalDecision;

/// Stream of runtime events for one turn. `Err` items are per-event
/// failures; the stream may continue after one.
pub type ExecutionEventStream =
    Pin<Box<dyn Stream<Item = Result<ExecutionEvent, RuntimeError>> + Send>>;

/// Everything the runtime needs to run one turn.
#[derive(Clone, Debug)]
pub struct RunRequest {
    /// Session snapshot, including history up to (not including) this turn.
    pub session: Session,
    /// ID shared by every event of this turn.
    pub invocation_id: String,
    /// Inbound user parts.
    pub new_message: Vec<ContentPart>,
    /// Approval decision parsed from the inbound message, if any.
    pub decision: Option<ApprovalDecision>,
    /// Function responses answering pending approval calls.
    pub resume_parts: Vec<ContentPart>,
}

/// An agent loop driven by the executor.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Author name stamped on the events this runtime produces.
    fn name(&self) -> &str;

    /// Start a turn. An `Err` means the turn could not start at all.
    async fn run(&self, request: RunRequest) -> Result<ExecutionEventStream, RuntimeError>;
}
