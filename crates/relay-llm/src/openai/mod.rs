//! OpenAI-compatible chat-completions backend.
//!
//! - [`types`]: wire request, response, and delta-frame shapes
//! - [`message_converter`]: canonical request to wire request
//! - [`stream_handler`]: delta-frame state machine and tool-call accumulation
//! - [`client`]: reqwest backend

pub mod client;
pub mod message_converter;
pub mod stream_handler;
pub mod types;
