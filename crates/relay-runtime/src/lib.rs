//! # relay-runtime
//!
//! Execution orchestrator for the relay bridge.
//!
//! - **Executor**: drives one agent turn, runs the task state machine, and
//!   writes A2A protocol events to an [`EventSink`]
//! - **Aggregator**: folds non-partial output into one final result with
//!   failure and auth states dominating
//! - **HITL**: tool-approval interrupts and decision parsing
//! - **Persistence**: which events reach session history, written on a
//!   detached worker
//! - **Seams**: [`AgentRuntime`] (the planner) and [`EventSink`] (the
//!   transport), plus [`ModelRuntime`], a single-call runtime over the
//!   response assembler

#![deny(unsafe_code)]

pub mod errors;
pub mod executor;
pub mod hitl;
pub mod model;
pub mod runtime;
pub mod sink;

pub use errors::{RuntimeError, SinkError};
pub use executor::{Executor, ExecutorConfig, TurnContext};
pub use hitl::{ApprovalDecision, ToolApprovalRequest};
pub use model::ModelRuntime;
pub use runtime::{AgentRuntime, ExecutionEventStream, RunRequest};
pub use sink::{ChannelSink, EventSink};
