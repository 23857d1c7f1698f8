//! # Executor
//!
//! Drives one agent turn and republishes it as A2A protocol events.
//!
//! ## Turn lifecycle
//!
//! 1. Resolve the session (get, else create with a name from the first text).
//! 2. `Submitted` (first message only), then `Working`.
//! 3. Parse any approval decision and answer pending approvals from history.
//! 4. Queue the header event, then start the runtime on a spawned producer.
//! 5. Consume runtime items in order, emitting and aggregating. Approval
//!    interrupts are emitted as they arrive and merged into the final event.
//! 6. Emit the final event chosen by the [`TaskAggregator`].
//!
//! ## Cancellation
//!
//! The producer owns the runtime stream and the session writer. It runs under
//! the execution timeout only: if the caller goes away it keeps draining the
//! runtime (and persisting) without forwarding. An explicit cancellation token
//! aborts it and ends the turn `Canceled`.

pub mod aggregator;
pub mod converter;
pub mod emitter;
pub mod persistence;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use relay_core::constants::{META_AUTHOR, META_ERROR_CODE, META_INVOCATION_ID, META_PARTIAL};
use relay_core::content::{ContentPart, first_text};
use relay_core::errors::failure_message;
use relay_core::events::{ErrorCarrier, ExecutionEvent};
use relay_core::protocol::{Message, Metadata, TaskState};
use relay_core::text::truncate_with_ellipsis;
use relay_events::{CreateSessionOptions, Session, SessionKey, SessionService, StoredEvent};
use relay_settings::RelaySettings;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::errors::{RuntimeError, SinkError};
use crate::hitl::{self, ToolApprovalRequest};
use crate::runtime::{AgentRuntime, RunRequest};
use crate::sink::EventSink;

use self::aggregator::{TaskAggregator, TurnOutcome};
use self::converter::{convert_event, decode_inbound};
use self::emitter::TurnEmitter;
use self::persistence::{SessionWriter, should_persist};

/// Error code on the final event when the runtime produced nothing.
pub const UNEXPECTED_END_CODE: &str = "UNEXPECTED_END";

/// Message on the final event when the runtime produced nothing.
pub const UNEXPECTED_END_MESSAGE: &str =
    "The agent finished unexpectedly without producing a response.";

/// Message on the final event of a canceled turn.
pub const CANCELED_MESSAGE: &str = "The task was canceled.";

type RuntimeItem = Result<ExecutionEvent, RuntimeError>;

/// Executor configuration.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Application name reported in metadata and session keys.
    pub app_name: String,
    /// Upper bound on one runtime invocation.
    pub execution_timeout: Duration,
    /// Upper bound on one session append.
    pub session_append_timeout: Duration,
    /// Session names are cut to this many characters.
    pub session_name_max_chars: usize,
    /// Runtime items buffered between producer and consumer.
    pub event_queue_capacity: usize,
}

impl ExecutorConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &RelaySettings) -> Self {
        Self {
            app_name: settings.app_name.clone(),
            execution_timeout: settings.execution.timeout(),
            session_append_timeout: settings.execution.session_append_timeout(),
            session_name_max_chars: settings.execution.session_name_max_chars,
            event_queue_capacity: settings.execution.event_queue_capacity,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from_settings(&RelaySettings::default())
    }
}

/// Per-turn inputs besides the inbound message.
#[derive(Clone, Debug)]
pub struct TurnContext {
    /// A2A task ID.
    pub task_id: String,
    /// A2A context ID, used as the session ID.
    pub context_id: String,
    /// Calling user.
    pub user_id: String,
    /// Whether this is the first message of the task.
    pub is_first_message: bool,
    /// Fires when the task is explicitly canceled.
    pub cancel: CancellationToken,
}

impl TurnContext {
    /// A first-message turn with a fresh cancellation token.
    pub fn new(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            user_id: user_id.into(),
            is_first_message: true,
            cancel: CancellationToken::new(),
        }
    }

    /// Mark whether this is the task's first message.
    #[must_use]
    pub fn with_first_message(mut self, first: bool) -> Self {
        self.is_first_message = first;
        self
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Session name derived from the first non-blank text part.
pub fn session_name(parts: &[ContentPart], max_chars: usize) -> Option<String> {
    first_text(parts).map(|text| truncate_with_ellipsis(text.trim(), max_chars))
}

/// The execution orchestrator.
pub struct Executor {
    runtime: Arc<dyn AgentRuntime>,
    sessions: Arc<dyn SessionService>,
    config: ExecutorConfig,
}

impl Executor {
    /// Create an executor.
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        sessions: Arc<dyn SessionService>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            runtime,
            sessions,
            config,
        }
    }

    /// Run one turn, writing every protocol event to `sink`.
    ///
    /// Returns the state of the final event. Only sink failures return `Err`.
    #[instrument(skip_all, fields(task_id = %turn.task_id, context_id = %turn.context_id))]
    pub async fn execute(
        &self,
        turn: TurnContext,
        message: Message,
        sink: &dyn EventSink,
    ) -> Result<TaskState, RuntimeError> {
        let emitter = TurnEmitter::new(
            sink,
            &turn.task_id,
            &turn.context_id,
            &self.config.app_name,
            &turn.user_id,
        );
        let parts = decode_inbound(&message);
        let key = SessionKey::new(&self.config.app_name, &turn.user_id, &turn.context_id);
        let session = self.get_or_create_session(&key, &parts).await;

        if turn.is_first_message {
            emitter
                .status(TaskState::Submitted, Some(message.clone()), false, Metadata::new())
                .await?;
        }
        emitter
            .status(TaskState::Working, None, false, Metadata::new())
            .await?;

        let pending = hitl::pending_approvals(&session);
        let decision = hitl::parse_decision(&message.parts).filter(|_| !pending.is_empty());
        let resume_parts = decision
            .map(|d| hitl::decision_responses(&pending, d))
            .unwrap_or_default();
        if let Some(decision) = decision {
            info!(?decision, calls = pending.len(), "resuming after tool approval");
        }

        let invocation_id = format!("e-{}", Uuid::now_v7());
        let writer = SessionWriter::spawn(
            Arc::clone(&self.sessions),
            key,
            self.config.session_append_timeout,
        );
        let header: Vec<ContentPart> = resume_parts.iter().chain(&parts).cloned().collect();
        writer
            .append(StoredEvent::header(&invocation_id, header))
            .await;

        let request = RunRequest {
            session,
            invocation_id,
            new_message: parts,
            decision,
            resume_parts,
        };
        let (mut rx, producer) = self.spawn_producer(request, writer);

        let mut run = TurnRun {
            emitter,
            aggregator: TaskAggregator::new(),
            approvals: Vec::new(),
            events: 0,
        };
        loop {
            let item = tokio::select! {
                biased;
                () = turn.cancel.cancelled() => {
                    producer.abort();
                    info!(events = run.events, "turn canceled");
                    run.emitter
                        .status(
                            TaskState::Canceled,
                            Some(Message::agent_text(CANCELED_MESSAGE)),
                            true,
                            Metadata::new(),
                        )
                        .await?;
                    return Ok(TaskState::Canceled);
                }
                item = rx.recv() => item,
            };
            match item {
                Some(item) => run.handle(item).await?,
                None => break,
            }
        }

        let state = run.finish().await?;
        Ok(state)
    }

    async fn get_or_create_session(&self, key: &SessionKey, parts: &[ContentPart]) -> Session {
        match self.sessions.get_session(key).await {
            Ok(Some(session)) => return session,
            Ok(None) => {}
            Err(e) => {
                warn!(
                    error = %e,
                    category = e.category(),
                    "session lookup failed, continuing detached"
                );
                return detached_session(key, None);
            }
        }

        let name = session_name(parts, self.config.session_name_max_chars);
        let options = CreateSessionOptions {
            name: name.clone(),
            ..CreateSessionOptions::default()
        };
        match self.sessions.create_session(key, options).await {
            Ok(session) => {
                debug!(session_id = %session.id, name = ?session.name, "session created");
                session
            }
            Err(e) => {
                warn!(
                    error = %e,
                    category = e.category(),
                    "session creation failed, continuing detached"
                );
                detached_session(key, name)
            }
        }
    }

    fn spawn_producer(
        &self,
        request: RunRequest,
        writer: SessionWriter,
    ) -> (mpsc::Receiver<RuntimeItem>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.config.event_queue_capacity.max(1));
        let runtime = Arc::clone(&self.runtime);
        let limit = self.config.execution_timeout;
        let handle = tokio::spawn(async move {
            let drive = drive_runtime(runtime.as_ref(), request, &writer, &tx);
            if tokio::time::timeout(limit, drive).await.is_err() {
                let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms, "runtime exceeded execution timeout");
                let _ = tx.send(Err(RuntimeError::Timeout(limit))).await;
            }
            writer.flush().await;
        });
        (rx, handle)
    }
}

/// Pull every runtime item, persist per policy, and forward while someone
/// is listening.
async fn drive_runtime(
    runtime: &dyn AgentRuntime,
    request: RunRequest,
    writer: &SessionWriter,
    tx: &mpsc::Sender<RuntimeItem>,
) {
    let mut stream = match runtime.run(request).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            return;
        }
    };

    let mut forwarding = true;
    while let Some(item) = stream.next().await {
        if let Ok(event) = &item {
            if should_persist(event) {
                writer.append(StoredEvent::execution(event.clone())).await;
            }
        }
        if forwarding && tx.send(item).await.is_err() {
            debug!("consumer gone, draining runtime without forwarding");
            forwarding = false;
        }
    }
}

fn detached_session(key: &SessionKey, name: Option<String>) -> Session {
    Session {
        id: key.session_id.clone(),
        user_id: key.user_id.clone(),
        app_name: key.app_name.clone(),
        name,
        ..Session::default()
    }
}

fn event_metadata(event: &ExecutionEvent) -> Metadata {
    let mut metadata = Metadata::new();
    if !event.author.is_empty() {
        let _ = metadata.insert(META_AUTHOR.into(), Value::String(event.author.clone()));
    }
    if !event.invocation_id.is_empty() {
        let _ = metadata.insert(
            META_INVOCATION_ID.into(),
            Value::String(event.invocation_id.clone()),
        );
    }
    metadata
}

/// Consumer-side state of one turn.
struct TurnRun<'a> {
    emitter: TurnEmitter<'a>,
    aggregator: TaskAggregator,
    /// Every approval requested so far, in arrival order.
    approvals: Vec<ToolApprovalRequest>,
    events: usize,
}

impl TurnRun<'_> {
    async fn handle(&mut self, item: RuntimeItem) -> Result<(), SinkError> {
        self.events += 1;
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, category = err.category(), "runtime reported an error");
                let (code, message) = err.failure();
                let text = failure_message(&code, Some(&message));
                return self.fail(&code, text, Metadata::new()).await;
            }
        };
        debug!(
            author = %event.author,
            partial = event.partial,
            parts = event.content.len(),
            "runtime event"
        );

        if event.is_failure() {
            let code = event.error_code().unwrap_or_default();
            let text = failure_message(code, event.error_message());
            return self.fail(code, text, event_metadata(&event)).await;
        }

        let requests = hitl::approval_requests(&event);
        if !requests.is_empty() {
            return self.interrupt(&event, requests).await;
        }

        let Some(converted) = convert_event(&event) else {
            return Ok(());
        };
        let mut extra = event_metadata(&event);

        if event.partial {
            let _ = extra.insert(META_PARTIAL.into(), Value::Bool(true));
            return self
                .emitter
                .status(TaskState::Working, Some(converted.message), false, extra)
                .await;
        }

        if converted.state != TaskState::Working {
            debug!(state = %converted.state, "long-running call recorded");
        }
        self.aggregator
            .observe(converted.state, Some(converted.message.clone()));
        if converted.carries_tool_content {
            self.emitter
                .status(TaskState::Working, Some(converted.message), false, extra)
                .await?;
        }
        Ok(())
    }

    /// Surface an approval interrupt now and fold it into the final message,
    /// which lists every approval of the turn.
    async fn interrupt(
        &mut self,
        event: &ExecutionEvent,
        requests: Vec<ToolApprovalRequest>,
    ) -> Result<(), SinkError> {
        let dominant = self.aggregator.state();
        if matches!(dominant, TaskState::Failed | TaskState::AuthRequired) {
            debug!(state = %dominant, calls = requests.len(), "approval interrupt outranked");
            return Ok(());
        }
        info!(calls = requests.len(), "tool approval required");
        self.emitter
            .status(
                TaskState::InputRequired,
                Some(hitl::interrupt_message(&requests)),
                false,
                event_metadata(event),
            )
            .await?;
        self.approvals.extend(requests);
        self.aggregator.observe(
            TaskState::InputRequired,
            Some(hitl::interrupt_message(&self.approvals)),
        );
        Ok(())
    }

    async fn fail(
        &mut self,
        code: &str,
        text: String,
        mut extra: Metadata,
    ) -> Result<(), SinkError> {
        let message = Message::agent_text(text);
        let _ = extra.insert(META_ERROR_CODE.into(), Value::String(code.to_owned()));
        self.emitter
            .status(TaskState::Failed, Some(message.clone()), false, extra)
            .await?;
        self.aggregator.observe_failure(code, message);
        Ok(())
    }

    async fn finish(self) -> Result<TaskState, SinkError> {
        let outcome = self.aggregator.finish();
        let state = outcome.state();
        match outcome {
            TurnOutcome::Completed { parts } => {
                self.emitter.artifact(parts).await?;
                self.emitter
                    .status(TaskState::Completed, None, true, Metadata::new())
                    .await?;
            }
            TurnOutcome::Unexpected => {
                warn!(events = self.events, "runtime ended without output");
                let mut extra = Metadata::new();
                let _ = extra.insert(
                    META_ERROR_CODE.into(),
                    Value::String(UNEXPECTED_END_CODE.into()),
                );
                self.emitter
                    .status(
                        TaskState::Failed,
                        Some(Message::agent_text(UNEXPECTED_END_MESSAGE)),
                        true,
                        extra,
                    )
                    .await?;
            }
            TurnOutcome::Status {
                state,
                message,
                error_code,
            } => {
                let mut extra = Metadata::new();
                if let Some(code) = error_code {
                    let _ = extra.insert(META_ERROR_CODE.into(), Value::String(code));
                }
                self.emitter.status(state, message, true, extra).await?;
            }
        }
        info!(state = %state, events = self.events, "turn finished");
        Ok(state)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
