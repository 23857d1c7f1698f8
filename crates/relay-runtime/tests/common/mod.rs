//! Shared fixtures for executor integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use relay_core::content::ContentPart;
use relay_core::events::ExecutionEvent;
use relay_core::protocol::{Message, Part, ProtocolEvent, TaskState};
use relay_events::{InMemorySessionService, SessionService};
use relay_runtime::{
    AgentRuntime, EventSink, ExecutionEventStream, Executor, ExecutorConfig, RunRequest,
    RuntimeError, SinkError, TurnContext,
};

pub type RuntimeItem = Result<ExecutionEvent, RuntimeError>;

/// Runtime that replays one script per turn and records what it was asked.
pub struct ScriptedRuntime {
    scripts: Mutex<Vec<ExecutionEventStream>>,
    pub requests: Mutex<Vec<RunRequest>>,
}

impl ScriptedRuntime {
    pub fn new(turns: Vec<ExecutionEventStream>) -> Arc<Self> {
        let mut scripts = turns;
        scripts.reverse();
        Arc::new(Self {
            scripts: Mutex::new(scripts),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn single(items: Vec<RuntimeItem>) -> Arc<Self> {
        Self::new(vec![script(items)])
    }

    pub fn last_request(&self) -> RunRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

pub fn script(items: Vec<RuntimeItem>) -> ExecutionEventStream {
    Box::pin(futures::stream::iter(items))
}

#[async_trait]
impl AgentRuntime for ScriptedRuntime {
    fn name(&self) -> &str {
        "agent"
    }

    async fn run(&self, request: RunRequest) -> Result<ExecutionEventStream, RuntimeError> {
        self.requests.lock().unwrap().push(request);
        self.scripts
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| RuntimeError::Internal("no script left".into()))
    }
}

/// Sink that records every event, optionally failing from the n-th write on.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<ProtocolEvent>>,
    pub fail_from: Option<usize>,
}

impl RecordingSink {
    pub fn failing_from(n: usize) -> Self {
        Self {
            fail_from: Some(n),
            ..Self::default()
        }
    }

    pub fn take(&self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn write(&self, event: ProtocolEvent) -> Result<(), SinkError> {
        let mut events = self.events.lock().unwrap();
        if self.fail_from.is_some_and(|n| events.len() >= n) {
            return Err(SinkError::Closed);
        }
        events.push(event);
        Ok(())
    }
}

pub fn config() -> ExecutorConfig {
    ExecutorConfig {
        app_name: "relay-test".into(),
        execution_timeout: Duration::from_secs(30),
        session_append_timeout: Duration::from_secs(1),
        session_name_max_chars: 20,
        event_queue_capacity: 8,
    }
}

pub fn executor(runtime: Arc<dyn AgentRuntime>, sessions: Arc<dyn SessionService>) -> Executor {
    Executor::new(runtime, sessions, config())
}

pub fn turn() -> TurnContext {
    TurnContext::new("task-1", "ctx-1", "user-1")
}

pub fn user_text(text: &str) -> Message {
    Message::user(vec![Part::text(text)])
}

pub fn text_event(text: &str) -> RuntimeItem {
    Ok(ExecutionEvent::new("agent", vec![ContentPart::text(text)]).with_invocation_id("e-1"))
}

pub fn partial_text(text: &str) -> RuntimeItem {
    Ok(ExecutionEvent::partial("agent", vec![ContentPart::text(text)]).with_invocation_id("e-1"))
}

pub fn long_running_call(id: &str, name: &str) -> RuntimeItem {
    let args = serde_json::json!({"target": "prod"}).as_object().cloned().unwrap();
    Ok(
        ExecutionEvent::new("agent", vec![ContentPart::function_call(id, name, args)])
            .with_long_running_ids(vec![id.into()]),
    )
}

pub async fn run(
    runtime: Arc<dyn AgentRuntime>,
    sessions: Arc<InMemorySessionService>,
    turn: TurnContext,
    message: Message,
) -> (Result<TaskState, RuntimeError>, Vec<ProtocolEvent>) {
    let sink = RecordingSink::default();
    let result = executor(runtime, sessions).execute(turn, message, &sink).await;
    (result, sink.take())
}

/// `(state, final)` for status updates, `None` for artifacts.
pub fn shape(events: &[ProtocolEvent]) -> Vec<Option<(TaskState, bool)>> {
    events
        .iter()
        .map(|e| e.state().map(|s| (s, e.is_final())))
        .collect()
}

pub fn status_text(event: &ProtocolEvent) -> String {
    match event {
        ProtocolEvent::StatusUpdate(e) => e
            .status
            .message
            .as_ref()
            .map(Message::text)
            .unwrap_or_default(),
        ProtocolEvent::ArtifactUpdate(_) => String::new(),
    }
}

pub fn artifact_parts(events: &[ProtocolEvent]) -> Vec<Part> {
    events
        .iter()
        .filter_map(|e| match e {
            ProtocolEvent::ArtifactUpdate(a) => Some(a.artifact.parts.clone()),
            ProtocolEvent::StatusUpdate(_) => None,
        })
        .flatten()
        .collect()
}
