//! `OpenAI`-compatible chat-completions client implementing [`ChatBackend`].
//!
//! Bearer auth, JSON bodies, SSE for streaming. Works against any server that
//! speaks `POST {base_url}/chat/completions`.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use relay_settings::LlmSettings;

use super::types::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse};
use crate::error_parsing::{error_for_status, parse_api_error, parse_retry_after_secs};
use crate::provider::{ChatBackend, ChunkStream, ProviderError, ProviderResult};
use crate::sse::parse_sse_lines;

/// Default base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client configuration.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Base URL up to and including the version segment.
    pub base_url: String,
    /// Default model ID.
    pub model: String,
    /// API key; requests go out unauthenticated when absent.
    pub api_key: Option<String>,
    /// Whole-request timeout for non-streaming calls.
    pub request_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
}

impl OpenAiConfig {
    /// Configuration for `model` against the default endpoint.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            model: model.into(),
            api_key: None,
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Build from settings, reading the key from the configured env var.
    #[must_use]
    pub fn from_settings(settings: &LlmSettings) -> Self {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        if api_key.is_none() {
            debug!(env = %settings.api_key_env, "no API key in environment");
        }
        Self {
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            api_key,
            request_timeout: settings.request_timeout(),
            connect_timeout: settings.connect_timeout(),
        }
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Chat-completions HTTP backend.
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client with its own connection pool.
    pub fn new(config: OpenAiConfig) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// Create a client sharing an existing connection pool.
    #[must_use]
    pub fn with_client(config: OpenAiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn build_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                ProviderError::Auth {
                    message: format!("invalid API key header: {e}"),
                }
            })?;
            let _ = headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn post(
        &self,
        request: &ChatCompletionRequest,
        timeout: Option<Duration>,
    ) -> ProviderResult<reqwest::Response> {
        debug!(
            model = %request.model,
            message_count = request.messages.len(),
            tool_count = request.tools.len(),
            stream = request.stream,
            "sending chat completion request"
        );

        let mut builder = self
            .client
            .post(self.config.endpoint())
            .headers(self.build_headers()?)
            .json(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after_secs);
        let body = response.text().await.unwrap_or_default();
        let err = error_for_status(status.as_u16(), &body, retry_after);
        error!(
            status = status.as_u16(),
            category = err.category(),
            error = %err,
            "chat completion request failed"
        );
        Err(err)
    }
}

/// Decode one SSE payload.
///
/// Error envelopes sent inside the stream become [`ProviderError::Api`];
/// undecodable frames are logged and skipped.
fn decode_frame(data: &str) -> Option<ProviderResult<ChatCompletionChunk>> {
    let value: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, data_preview = %relay_core::text::truncate_with_ellipsis(data, 100), "failed to parse SSE frame");
            return None;
        }
    };
    if value.get("error").is_some_and(Value::is_object) {
        let info = parse_api_error(data, 200);
        return Some(Err(ProviderError::Api {
            status: 200,
            message: info.message,
            code: info.code,
        }));
    }
    match serde_json::from_value(value) {
        Ok(chunk) => Some(Ok(chunk)),
        Err(e) => {
            warn!(error = %e, "SSE frame is not a chat completion chunk");
            None
        }
    }
}

fn sse_to_chunk_stream(response: reqwest::Response) -> ChunkStream {
    let frames = parse_sse_lines(response.bytes_stream()).filter_map(|line| async move {
        match line {
            Ok(data) => decode_frame(&data),
            Err(e) => Some(Err(ProviderError::Http(e))),
        }
    });
    Box::pin(frames)
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> ProviderResult<ChatCompletionResponse> {
        let response = self.post(request, Some(self.config.request_timeout)).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> ProviderResult<ChunkStream> {
        let response = self.post(request, None).await?;
        Ok(sse_to_chunk_stream(response))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
