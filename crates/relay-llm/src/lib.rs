//! # relay-llm
//!
//! LLM backend plumbing for the relay execution bridge:
//!
//! - [`ChatBackend`]: the seam every chat-completion backend implements
//! - [`OpenAiClient`]: reqwest backend for OpenAI-compatible endpoints
//! - [`ResponseAssembler`]: reduces a backend stream (or single response)
//!   to canonical [`LlmResponse`]s, reassembling tool-call arguments that
//!   arrive split across delta frames
//! - shared SSE line parser, API error parsing, and fail-open tool argument
//!   parsing

#![deny(unsafe_code)]

pub mod assembler;
pub mod error_parsing;
pub mod openai;
pub mod provider;
pub mod request;
pub mod response;
pub mod sse;
pub mod tool_parsing;

pub use assembler::{LlmResponseStream, ResponseAssembler};
pub use openai::client::{OpenAiClient, OpenAiConfig};
pub use provider::{ChatBackend, ChunkStream, ProviderError, ProviderResult};
pub use request::{Content, ContentRole, FunctionDeclaration, LlmRequest};
pub use response::LlmResponse;
pub use tool_parsing::{ToolCallContext, parse_tool_call_arguments};
