use std::time::Duration;

use serde::{Deserialize, Serialize};

/// OpenAI-compatible backend connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// Base URL up to and including the API version segment.
    pub base_url: String,
    /// Default model ID.
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Whole-request timeout for non-streaming calls.
    pub request_timeout_ms: u64,
    /// TCP connect timeout.
    pub connect_timeout_ms: u64,
    /// Default sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Default output token limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl LlmSettings {
    /// [`request_timeout_ms`](Self::request_timeout_ms) as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// [`connect_timeout_ms`](Self::connect_timeout_ms) as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            request_timeout_ms: 120_000,
            connect_timeout_ms: 10_000,
            temperature: None,
            max_tokens: None,
        }
    }
}
