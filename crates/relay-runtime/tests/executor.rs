//! End-to-end turns through the executor with scripted runtimes.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::*;
use relay_core::content::ContentPart;
use relay_core::errors::{ErrorCode, GENERIC_ERROR_MESSAGE};
use relay_core::events::ExecutionEvent;
use relay_core::protocol::{Part, ProtocolEvent, TaskState};
use relay_events::{InMemorySessionService, SessionKey, SessionService, StoredEventKind};
use relay_runtime::executor::{UNEXPECTED_END_CODE, UNEXPECTED_END_MESSAGE};
use relay_runtime::{RuntimeError, SinkError};

fn key() -> SessionKey {
    SessionKey::new("relay-test", "user-1", "ctx-1")
}

#[tokio::test]
async fn single_text_turn_completes() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![text_event("Paris is sunny.")]);
    let (result, events) = run(
        runtime,
        sessions.clone(),
        turn(),
        user_text("What's the weather in Paris this weekend?"),
    )
    .await;

    assert_eq!(result.unwrap(), TaskState::Completed);
    assert_eq!(
        shape(&events),
        vec![
            Some((TaskState::Submitted, false)),
            Some((TaskState::Working, false)),
            None,
            Some((TaskState::Completed, true)),
        ]
    );
    assert_matches!(&events[2], ProtocolEvent::ArtifactUpdate(a) => {
        assert!(a.last_chunk);
        assert_eq!(a.artifact.parts, vec![Part::text("Paris is sunny.")]);
    });
    for event in &events {
        let meta = event.metadata();
        assert_eq!(meta["app_name"], "relay-test");
        assert_eq!(meta["user_id"], "user-1");
        assert_eq!(meta["session_id"], "ctx-1");
    }

    let session = sessions.get_session(&key()).await.unwrap().unwrap();
    assert_eq!(session.name.as_deref(), Some("What's the weather i..."));
    assert_eq!(session.events.len(), 2);
    assert_eq!(session.events[0].kind, StoredEventKind::Header);
    assert_eq!(session.events[1].event.author, "agent");
}

#[tokio::test]
async fn follow_up_message_skips_submitted() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![text_event("ok")]);
    let (_, events) = run(
        runtime,
        sessions,
        turn().with_first_message(false),
        user_text("again"),
    )
    .await;
    assert_eq!(events[0].state(), Some(TaskState::Working));
    assert!(events.iter().all(|e| e.state() != Some(TaskState::Submitted)));
}

#[tokio::test]
async fn partials_stream_live_and_stay_out_of_history() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![
        partial_text("Hel"),
        partial_text("lo"),
        text_event("Hello"),
    ]);
    let (_, events) = run(runtime, sessions.clone(), turn(), user_text("hi")).await;

    assert_eq!(
        shape(&events),
        vec![
            Some((TaskState::Submitted, false)),
            Some((TaskState::Working, false)),
            Some((TaskState::Working, false)),
            Some((TaskState::Working, false)),
            None,
            Some((TaskState::Completed, true)),
        ]
    );
    assert_eq!(status_text(&events[2]), "Hel");
    assert_eq!(events[2].metadata()["partial"], true);
    assert_eq!(events[2].metadata()["author"], "agent");
    assert_eq!(events[2].metadata()["invocation_id"], "e-1");
    assert_eq!(artifact_parts(&events), vec![Part::text("Hello")]);

    let session = sessions.get_session(&key()).await.unwrap().unwrap();
    assert_eq!(session.events.len(), 2);
    assert!(!session.events[1].event.partial);
}

#[tokio::test]
async fn partial_tool_content_is_persisted() {
    let sessions = Arc::new(InMemorySessionService::new());
    let tool_result = ExecutionEvent::partial(
        "agent",
        vec![ContentPart::function_response("c1", "search", serde_json::Map::new())],
    );
    let runtime = ScriptedRuntime::single(vec![Ok(tool_result), text_event("done")]);
    let _ = run(runtime, sessions.clone(), turn(), user_text("go")).await;

    let session = sessions.get_session(&key()).await.unwrap().unwrap();
    assert_eq!(session.events.len(), 3);
    assert!(session.events[1].event.partial);
}

#[tokio::test]
async fn partial_function_call_reaches_the_sink() {
    let sessions = Arc::new(InMemorySessionService::new());
    let call = ExecutionEvent::partial(
        "agent",
        vec![ContentPart::function_call("c1", "search", serde_json::Map::new())],
    )
    .with_invocation_id("e-1");
    let runtime = ScriptedRuntime::single(vec![Ok(call), text_event("done")]);
    let (result, events) = run(runtime, sessions.clone(), turn(), user_text("go")).await;

    assert_eq!(result.unwrap(), TaskState::Completed);
    let live = events
        .iter()
        .find(|e| e.metadata().get("partial").is_some())
        .unwrap();
    assert_eq!(live.state(), Some(TaskState::Working));
    assert!(!live.is_final());
    assert_matches!(live, ProtocolEvent::StatusUpdate(s) => {
        let part = &s.status.message.as_ref().unwrap().parts[0];
        assert_eq!(part.as_data().unwrap()["name"], "search");
        assert_eq!(part.metadata().unwrap()["type"], "function_call");
    });

    // Streamed tool calls are kept in history; the artifact holds only the answer.
    let session = sessions.get_session(&key()).await.unwrap().unwrap();
    assert!(session.events[1].event.partial);
    assert_eq!(artifact_parts(&events), vec![Part::text("done")]);
}

#[tokio::test]
async fn tool_calls_are_emitted_and_included_in_artifact() {
    let sessions = Arc::new(InMemorySessionService::new());
    let call = ExecutionEvent::new(
        "agent",
        vec![ContentPart::function_call("c1", "search", serde_json::Map::new())],
    );
    let response = ExecutionEvent::new(
        "agent",
        vec![ContentPart::function_response("c1", "search", serde_json::Map::new())],
    );
    let runtime = ScriptedRuntime::single(vec![Ok(call), Ok(response), text_event("Found it.")]);
    let (result, events) = run(runtime, sessions, turn(), user_text("find")).await;

    assert_eq!(result.unwrap(), TaskState::Completed);
    let working_with_parts = events
        .iter()
        .filter(|e| e.state() == Some(TaskState::Working) && !e.is_final())
        .filter(|e| matches!(e, ProtocolEvent::StatusUpdate(s) if s.status.message.is_some()))
        .count();
    assert_eq!(working_with_parts, 2);
    let parts = artifact_parts(&events);
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[2], Part::text("Found it."));
}

#[tokio::test]
async fn error_event_fails_with_table_message() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![Ok(ExecutionEvent::error(
        "agent",
        "SAFETY",
        "candidate blocked: HARM_CATEGORY_DANGEROUS",
    ))]);
    let (result, events) = run(runtime, sessions, turn(), user_text("hi")).await;

    assert_eq!(result.unwrap(), TaskState::Failed);
    let failed: Vec<_> = events
        .iter()
        .filter(|e| e.state() == Some(TaskState::Failed))
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(!failed[0].is_final());
    assert!(failed[1].is_final());
    for event in failed {
        assert_eq!(status_text(event), ErrorCode::Safety.user_message());
        assert_eq!(event.metadata()["error_code"], "SAFETY");
    }
}

#[tokio::test]
async fn unknown_error_code_passes_message_through() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![
        Ok(ExecutionEvent::error("agent", "QUOTA_EXCEEDED", "Daily quota exhausted")),
        Ok(ExecutionEvent::error("agent", "WHATEVER", "")),
    ]);
    let (_, events) = run(runtime, sessions, turn(), user_text("hi")).await;

    let failed: Vec<_> = events
        .iter()
        .filter(|e| e.state() == Some(TaskState::Failed) && !e.is_final())
        .collect();
    assert_eq!(status_text(failed[0]), "Daily quota exhausted");
    assert_eq!(status_text(failed[1]), GENERIC_ERROR_MESSAGE);
}

#[tokio::test]
async fn runtime_error_is_classified_and_loop_continues() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![
        Err(RuntimeError::Tool {
            tool_name: "weather".into(),
            message: "tcp connect error: Connection refused (os error 111)".into(),
        }),
        text_event("Recovered answer."),
    ]);
    let (result, events) = run(runtime, sessions.clone(), turn(), user_text("hi")).await;

    assert_eq!(result.unwrap(), TaskState::Failed);
    let first_failure = events
        .iter()
        .find(|e| e.state() == Some(TaskState::Failed))
        .unwrap();
    assert_eq!(first_failure.metadata()["error_code"], "MCP_CONNECTION_REFUSED");
    assert!(status_text(first_failure).contains("refused the connection"));
    assert!(!status_text(first_failure).contains("os error"));
    assert!(artifact_parts(&events).is_empty());

    // The later event still reached history.
    let session = sessions.get_session(&key()).await.unwrap().unwrap();
    assert_eq!(session.events.len(), 2);
}

#[tokio::test]
async fn runtime_that_cannot_start_fails_the_turn() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::new(vec![]);
    let (result, events) = run(runtime, sessions, turn(), user_text("hi")).await;
    assert_eq!(result.unwrap(), TaskState::Failed);
    let last = events.last().unwrap();
    assert_eq!(last.metadata()["error_code"], "INTERNAL_ERROR");
    assert_eq!(status_text(last), GENERIC_ERROR_MESSAGE);
}

#[tokio::test]
async fn internal_error_text_never_reaches_the_user() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![Err(RuntimeError::Internal(
        "pg pool poisoned at worker.rs:88".into(),
    ))]);
    let (result, events) = run(runtime, sessions, turn(), user_text("hi")).await;

    assert_eq!(result.unwrap(), TaskState::Failed);
    let failed: Vec<_> = events
        .iter()
        .filter(|e| e.state() == Some(TaskState::Failed))
        .collect();
    assert_eq!(failed.len(), 2);
    for event in failed {
        assert_eq!(status_text(event), GENERIC_ERROR_MESSAGE);
        assert_eq!(event.metadata()["error_code"], "INTERNAL_ERROR");
    }
}

#[tokio::test]
async fn empty_run_finishes_unexpectedly() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![]);
    let (result, events) = run(runtime, sessions, turn(), user_text("hi")).await;

    assert_eq!(result.unwrap(), TaskState::Failed);
    let last = events.last().unwrap();
    assert!(last.is_final());
    assert_eq!(status_text(last), UNEXPECTED_END_MESSAGE);
    assert_eq!(last.metadata()["error_code"], UNEXPECTED_END_CODE);
}

#[tokio::test]
async fn stop_with_empty_content_emits_nothing() {
    let sessions = Arc::new(InMemorySessionService::new());
    let mut stop = ExecutionEvent::new("agent", vec![]);
    stop.error_code = Some("STOP".into());
    let runtime = ScriptedRuntime::single(vec![Ok(stop)]);
    let (_, events) = run(runtime, sessions, turn(), user_text("hi")).await;

    // Submitted, Working, then straight to the final event.
    assert_eq!(events.len(), 3);
    assert_eq!(status_text(&events[2]), UNEXPECTED_END_MESSAGE);
}

#[tokio::test]
async fn stop_with_content_completes() {
    let sessions = Arc::new(InMemorySessionService::new());
    let mut stop = ExecutionEvent::new("agent", vec![ContentPart::text("Done.")]);
    stop.error_code = Some("STOP".into());
    let runtime = ScriptedRuntime::single(vec![Ok(stop)]);
    let (result, _) = run(runtime, sessions, turn(), user_text("hi")).await;
    assert_eq!(result.unwrap(), TaskState::Completed);
}

#[tokio::test]
async fn credential_request_ends_auth_required() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![
        long_running_call("c1", "adk_request_credential"),
        text_event("waiting for sign-in"),
    ]);
    let (result, events) = run(runtime, sessions, turn(), user_text("read my mail")).await;

    assert_eq!(result.unwrap(), TaskState::AuthRequired);
    let last = events.last().unwrap();
    assert!(last.is_final());
    assert_matches!(last, ProtocolEvent::StatusUpdate(s) => {
        let parts = &s.status.message.as_ref().unwrap().parts;
        assert!(parts[0].is_long_running_call());
    });
    assert!(artifact_parts(&events).is_empty());
}

#[tokio::test]
async fn approval_call_beside_credential_request_interrupts() {
    let sessions = Arc::new(InMemorySessionService::new());
    let args = serde_json::json!({"target": "prod"}).as_object().cloned().unwrap();
    let mixed = ExecutionEvent::new(
        "agent",
        vec![
            ContentPart::function_call("cred-1", "adk_request_credential", serde_json::Map::new()),
            ContentPart::function_call("fc-1", "deploy_service", args),
        ],
    )
    .with_long_running_ids(vec!["cred-1".into(), "fc-1".into()]);
    let runtime = ScriptedRuntime::single(vec![Ok(mixed)]);
    let (result, events) = run(runtime, sessions, turn(), user_text("deploy")).await;

    assert_eq!(result.unwrap(), TaskState::InputRequired);
    assert!(events.iter().all(|e| e.state() != Some(TaskState::AuthRequired)));
    assert_matches!(events.last().unwrap(), ProtocolEvent::StatusUpdate(s) => {
        let data = s.status.message.as_ref().unwrap().parts[1].as_data().unwrap();
        assert_eq!(data["action_requests"].as_array().unwrap().len(), 1);
        assert_eq!(data["action_requests"][0]["id"], "fc-1");
    });
}

#[tokio::test]
async fn failure_outranks_auth_required() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![
        long_running_call("c1", "adk_request_credential"),
        Ok(ExecutionEvent::error("agent", "MAX_TOKENS", "")),
        long_running_call("c2", "adk_request_credential"),
    ]);
    let (result, _) = run(runtime, sessions, turn(), user_text("hi")).await;
    assert_eq!(result.unwrap(), TaskState::Failed);
}

#[tokio::test]
async fn sink_failure_is_fatal() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![text_event("never seen")]);
    let sink = RecordingSink::failing_from(1);
    let err = executor(runtime, sessions)
        .execute(turn(), user_text("hi"), &sink)
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert_matches!(err, RuntimeError::Sink(SinkError::Closed));
    assert_eq!(sink.take().len(), 1);
}

#[tokio::test]
async fn existing_session_is_reused() {
    let sessions = Arc::new(InMemorySessionService::new());
    let first = ScriptedRuntime::single(vec![text_event("one")]);
    let _ = run(first, sessions.clone(), turn(), user_text("first question")).await;
    let second = ScriptedRuntime::single(vec![text_event("two")]);
    let _ = run(
        second.clone(),
        sessions.clone(),
        turn().with_first_message(false),
        user_text("second question"),
    )
    .await;

    let request = second.last_request();
    assert_eq!(request.session.events.len(), 2);
    assert_eq!(request.session.name.as_deref(), Some("first question"));
    assert_eq!(sessions.len(), 1);
    let session = sessions.get_session(&key()).await.unwrap().unwrap();
    assert_eq!(session.events.len(), 4);
}

#[tokio::test]
async fn turn_runs_inside_an_execute_span() {
    let (logs, _guard) = relay_core::logging::capture_logs();
    let runtime = ScriptedRuntime::single(vec![text_event("done")]);
    let (result, _) = run(
        runtime,
        Arc::new(InMemorySessionService::new()),
        turn(),
        user_text("hi"),
    )
    .await;

    assert_eq!(result.unwrap(), TaskState::Completed);
    assert!(logs.has_span("execute"));
    let finished = logs
        .events()
        .into_iter()
        .find(|e| e.message.contains("turn finished"))
        .unwrap();
    assert_eq!(finished.field("state"), Some("completed"));
}
