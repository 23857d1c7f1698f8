//! # relay-events
//!
//! Session history for the relay execution bridge.
//!
//! - **Session model**: [`Session`] with its ordered log of [`StoredEvent`]s
//! - **Service seam**: [`SessionService`], the persistence collaborator the
//!   executor appends through
//! - **In-memory backend**: [`InMemorySessionService`] for tests and
//!   single-process deployments
//!
//! Stored events are the canonical `ExecutionEvent` plus an id, a timestamp
//! and a kind, serialized as self-describing JSON that re-parses to the same
//! shape.

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod service;
pub mod types;

pub use errors::{Result, SessionError};
pub use memory::InMemorySessionService;
pub use service::{CreateSessionOptions, SessionKey, SessionService};
pub use types::{Session, StoredEvent, StoredEventKind};
