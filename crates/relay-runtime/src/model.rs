//! Single-call model runtime.
//!
//! [`ModelRuntime`] is the simplest [`AgentRuntime`]: one model call per turn
//! through a [`ResponseAssembler`], with no tool execution of its own. Calls
//! to tools named in the approval set are marked long-running, so they pause
//! the turn for a human decision; the decision comes back on the next turn as
//! a function response in history.

use std::collections::HashSet;

use async_trait::async_trait;
use futures::StreamExt;
use relay_core::content::ContentPart;
use relay_core::events::ExecutionEvent;
use relay_events::{Session, StoredEventKind};
use relay_llm::{Content, ContentRole, FunctionDeclaration, LlmRequest, ResponseAssembler};
use relay_settings::LlmSettings;
use tracing::debug;

use crate::errors::RuntimeError;
use crate::runtime::{AgentRuntime, ExecutionEventStream, RunRequest};

/// One model call per turn.
pub struct ModelRuntime {
    name: String,
    assembler: ResponseAssembler,
    system_instruction: Option<String>,
    tools: Vec<FunctionDeclaration>,
    approval_tools: HashSet<String>,
    streaming: bool,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl ModelRuntime {
    /// Create a streaming runtime named `name`.
    pub fn new(name: impl Into<String>, assembler: ResponseAssembler) -> Self {
        Self {
            name: name.into(),
            assembler,
            system_instruction: None,
            tools: Vec::new(),
            approval_tools: HashSet::new(),
            streaming: true,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Take sampling limits from settings.
    #[must_use]
    pub fn with_llm_settings(mut self, settings: &LlmSettings) -> Self {
        self.temperature = settings.temperature;
        self.max_tokens = settings.max_tokens;
        self
    }

    /// Set the system instruction.
    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Declare tools the model may call.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<FunctionDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    /// Tools whose calls need a human decision before they run.
    #[must_use]
    pub fn requiring_approval<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.approval_tools = names.into_iter().map(Into::into).collect();
        self
    }

    /// Choose streaming or single-response generation.
    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Build the model request for a turn: history, then the new user turn.
    pub fn build_request(&self, request: &RunRequest) -> LlmRequest {
        let mut contents = history_contents(&request.session);
        let current: Vec<ContentPart> = request
            .resume_parts
            .iter()
            .chain(&request.new_message)
            .cloned()
            .collect();
        if !current.is_empty() {
            contents.push(Content {
                role: ContentRole::User,
                parts: current,
            });
        }
        LlmRequest {
            model: None,
            system_instruction: self.system_instruction.clone(),
            contents,
            tools: self.tools.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Replay non-partial history as model contents.
///
/// Header events and function responses are user turns; everything else the
/// runtime produced is a model turn. Within one event, tool results come
/// before the text that follows them.
fn history_contents(session: &Session) -> Vec<Content> {
    let mut contents = Vec::new();
    for stored in &session.events {
        let event = &stored.event;
        if event.partial || event.content.is_empty() {
            continue;
        }
        if stored.kind == StoredEventKind::Header {
            contents.push(Content {
                role: ContentRole::User,
                parts: event.content.clone(),
            });
            continue;
        }
        let (responses, model_parts): (Vec<_>, Vec<_>) = event
            .content
            .iter()
            .cloned()
            .partition(|p| matches!(p, ContentPart::FunctionResponse { .. }));
        if !responses.is_empty() {
            contents.push(Content {
                role: ContentRole::User,
                parts: responses,
            });
        }
        if !model_parts.is_empty() {
            contents.push(Content::model(model_parts));
        }
    }
    contents
}

#[async_trait]
impl AgentRuntime for ModelRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, request: RunRequest) -> Result<ExecutionEventStream, RuntimeError> {
        let llm_request = self.build_request(&request);
        debug!(
            contents = llm_request.contents.len(),
            tools = llm_request.tools.len(),
            streaming = self.streaming,
            "model runtime starting"
        );

        let responses = self.assembler.generate(llm_request, self.streaming);
        let author = self.name.clone();
        let invocation_id = request.invocation_id;
        let approval_tools = self.approval_tools.clone();

        let events = responses.map(move |item| -> Result<ExecutionEvent, RuntimeError> {
            let response = item.map_err(RuntimeError::Provider)?;
            let event = response.into_execution_event(author.clone(), invocation_id.clone());
            let long_running: Vec<String> = event
                .content
                .iter()
                .filter_map(|p| match p {
                    ContentPart::FunctionCall { id, name, .. } if approval_tools.contains(name) => {
                        Some(id.clone())
                    }
                    _ => None,
                })
                .collect();
            Ok(event.with_long_running_ids(long_running))
        });
        Ok(Box::pin(events))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::events::ErrorCarrier;
    use relay_events::StoredEvent;
    use relay_llm::{OpenAiClient, OpenAiConfig};
    use serde_json::{Map, json};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn run_request(session: Session, text: &str) -> RunRequest {
        RunRequest {
            session,
            invocation_id: "e-1".into(),
            new_message: vec![ContentPart::text(text)],
            decision: None,
            resume_parts: Vec::new(),
        }
    }

    fn runtime(server_uri: &str) -> ModelRuntime {
        let config = OpenAiConfig::new("gpt-test")
            .with_base_url(server_uri)
            .with_api_key("sk-test");
        let client = OpenAiClient::new(config).unwrap();
        ModelRuntime::new("assistant", ResponseAssembler::new(Arc::new(client)))
    }

    #[test]
    fn history_splits_function_responses_into_user_turns() {
        let mut session = Session::default();
        session
            .events
            .push(StoredEvent::header("e-0", vec![ContentPart::text("delete it")]));
        session.events.push(StoredEvent::execution(ExecutionEvent::new(
            "assistant",
            vec![ContentPart::function_call("c1", "delete_file", Map::new())],
        )));
        session.events.push(StoredEvent::execution(ExecutionEvent::partial(
            "assistant",
            vec![ContentPart::text("ignored")],
        )));
        session.events.push(StoredEvent::execution(ExecutionEvent::new(
            "assistant",
            vec![
                ContentPart::function_response("c1", "delete_file", Map::new()),
                ContentPart::text("Deleted."),
            ],
        )));

        let roles: Vec<_> = history_contents(&session).iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![
                ContentRole::User,
                ContentRole::Model,
                ContentRole::User,
                ContentRole::Model
            ]
        );
    }

    #[tokio::test]
    async fn request_puts_resume_parts_before_new_message() {
        let runtime = runtime("http://127.0.0.1:9").with_system_instruction("be brief");
        let mut request = run_request(Session::default(), "approve");
        request.resume_parts = vec![ContentPart::function_response("c1", "deploy", Map::new())];

        let llm = runtime.build_request(&request);
        assert_eq!(llm.system_instruction.as_deref(), Some("be brief"));
        assert_eq!(llm.contents.len(), 1);
        assert_eq!(llm.contents[0].parts.len(), 2);
        assert!(matches!(
            llm.contents[0].parts[0],
            ContentPart::FunctionResponse { .. }
        ));
    }

    #[tokio::test]
    async fn approval_tools_are_marked_long_running() {
        let server = MockServer::start().await;
        let body = json!({
            "id": "r1",
            "choices": [{
                "index": 0,
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "c1", "type": "function", "function": {"name": "deploy", "arguments": "{\"env\":\"prod\"}"}},
                        {"id": "c2", "type": "function", "function": {"name": "search", "arguments": "{}"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let runtime = runtime(&server.uri())
            .with_streaming(false)
            .requiring_approval(["deploy"]);
        let events: Vec<_> = runtime
            .run(run_request(Session::default(), "ship it"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        let event = events[0].as_ref().unwrap();
        assert_eq!(event.author, "assistant");
        assert_eq!(event.invocation_id, "e-1");
        assert_eq!(event.long_running_ids, vec!["c1".to_owned()]);
    }

    #[tokio::test]
    async fn truncated_answer_carries_max_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "r1",
                "choices": [{
                    "index": 0,
                    "message": {"content": "The first three steps are"},
                    "finish_reason": "length"
                }]
            })))
            .mount(&server)
            .await;

        let events: Vec<_> = runtime(&server.uri())
            .with_streaming(false)
            .run(run_request(Session::default(), "explain"))
            .await
            .unwrap()
            .collect()
            .await;

        let event = events[0].as_ref().unwrap();
        assert_eq!(event.error_code.as_deref(), Some("MAX_TOKENS"));
        assert!(event.is_failure());
    }

    #[tokio::test]
    async fn backend_failure_is_a_provider_error_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let events: Vec<_> = runtime(&server.uri())
            .with_streaming(false)
            .run(run_request(Session::default(), "hi"))
            .await
            .unwrap()
            .collect()
            .await;
        assert!(matches!(events[0], Err(RuntimeError::Provider(_))));
    }
}
