//! Canonical model request.
//!
//! Backend-neutral description of one model call, built from
//! [`ContentPart`]s. Backends convert it to their own wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_core::content::ContentPart;

/// Speaker of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    /// End user, including tool results fed back to the model.
    User,
    /// The model.
    Model,
}

/// One conversation turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Speaker.
    pub role: ContentRole,
    /// Ordered parts.
    pub parts: Vec<ContentPart>,
}

impl Content {
    /// A user turn holding one text part.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::User,
            parts: vec![ContentPart::text(text)],
        }
    }

    /// A model turn.
    #[must_use]
    pub fn model(parts: Vec<ContentPart>) -> Self {
        Self {
            role: ContentRole::Model,
            parts,
        }
    }
}

/// A tool the model may call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    #[serde(default)]
    pub description: String,
    /// JSON Schema of the arguments object.
    #[serde(default)]
    pub parameters: Value,
}

/// A backend-neutral model request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRequest {
    /// Model override; the backend default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// System instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    /// Conversation so far, oldest first.
    #[serde(default)]
    pub contents: Vec<Content>,
    /// Callable tools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<FunctionDeclaration>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Output token limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}
