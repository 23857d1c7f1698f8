//! # relay-core
//!
//! Shared vocabulary for the relay execution bridge:
//!
//! - [`content`]: canonical content parts (text, function call/response, code)
//! - [`events`]: runtime execution events and their capability traits
//! - [`protocol`]: A2A task, message, status and artifact types
//! - [`errors`]: runtime error-code table and transport error classification
//! - [`ids`]: branded ID newtypes
//! - [`logging`]: `tracing` subscriber setup and test capture
//! - [`text`]: truncation and markdown escaping helpers
//!
//! Nothing here performs I/O.

#![deny(unsafe_code)]

pub mod constants;
pub mod content;
pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod protocol;
pub mod text;
