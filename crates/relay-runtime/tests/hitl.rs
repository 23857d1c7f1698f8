//! Tool-approval interrupts across two turns.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::*;
use relay_core::content::ContentPart;
use relay_core::protocol::{Message, Part, ProtocolEvent, TaskState};
use relay_events::{InMemorySessionService, SessionKey, SessionService, StoredEventKind};
use relay_runtime::ApprovalDecision;
use serde_json::json;

#[tokio::test]
async fn approval_call_interrupts_then_resumes() {
    let sessions = Arc::new(InMemorySessionService::new());

    // Turn 1: the runtime asks to run a guarded tool.
    let first = ScriptedRuntime::single(vec![
        partial_text("Let me deploy that."),
        long_running_call("fc-1", "deploy_service"),
    ]);
    let (result, events) = run(first, sessions.clone(), turn(), user_text("deploy v2")).await;

    assert_eq!(result.unwrap(), TaskState::InputRequired);
    assert!(artifact_parts(&events).is_empty());
    let last = events.last().unwrap();
    assert!(last.is_final());
    assert_matches!(last, ProtocolEvent::StatusUpdate(s) => {
        let message = s.status.message.as_ref().unwrap();
        assert_eq!(message.parts.len(), 2);
        let markdown = message.parts[0].as_text().unwrap();
        assert!(markdown.contains("`deploy_service`"));
        let data = message.parts[1].as_data().unwrap();
        assert_eq!(data["interrupt_type"], "tool_approval");
        assert_eq!(
            data["action_requests"],
            json!([{"name": "deploy_service", "args": {"target": "prod"}, "id": "fc-1"}])
        );
    });
    // Emitted when it happens, then again as the final event.
    assert_eq!(
        shape(&events)
            .into_iter()
            .filter(|s| matches!(s, Some((TaskState::InputRequired, _))))
            .collect::<Vec<_>>(),
        vec![
            Some((TaskState::InputRequired, false)),
            Some((TaskState::InputRequired, true)),
        ]
    );

    // Turn 2: the person approves.
    let second = ScriptedRuntime::single(vec![text_event("Deployed.")]);
    let (result, _) = run(
        second.clone(),
        sessions.clone(),
        turn().with_first_message(false),
        user_text("Yes, go ahead"),
    )
    .await;
    assert_eq!(result.unwrap(), TaskState::Completed);

    let request = second.last_request();
    assert_eq!(request.decision, Some(ApprovalDecision::Approve));
    assert_eq!(request.resume_parts.len(), 1);
    assert_matches!(&request.resume_parts[0], ContentPart::FunctionResponse { id, name, response } => {
        assert_eq!(id, "fc-1");
        assert_eq!(name, "deploy_service");
        assert_eq!(response["approved"], true);
    });

    // The synthesized response is recorded in history ahead of the user text.
    let session = sessions
        .get_session(&SessionKey::new("relay-test", "user-1", "ctx-1"))
        .await
        .unwrap()
        .unwrap();
    let header = session
        .events
        .iter()
        .rev()
        .find(|e| e.kind == StoredEventKind::Header)
        .unwrap();
    assert!(matches!(
        header.event.content[0],
        ContentPart::FunctionResponse { .. }
    ));
    assert_eq!(header.event.content[1], ContentPart::text("Yes, go ahead"));
}

#[tokio::test]
async fn structured_denial_is_forwarded() {
    let sessions = Arc::new(InMemorySessionService::new());
    let first = ScriptedRuntime::single(vec![long_running_call("fc-1", "drop_table")]);
    let _ = run(first, sessions.clone(), turn(), user_text("clean up")).await;

    let second = ScriptedRuntime::single(vec![text_event("Okay, left it alone.")]);
    let reply = Message::user(vec![Part::data(json!({"decision_type": "reject"}))]);
    let _ = run(
        second.clone(),
        sessions,
        turn().with_first_message(false),
        reply,
    )
    .await;

    let request = second.last_request();
    assert_eq!(request.decision, Some(ApprovalDecision::Deny));
    assert_matches!(&request.resume_parts[0], ContentPart::FunctionResponse { response, .. } => {
        assert_eq!(response["approved"], false);
    });
}

#[tokio::test]
async fn decision_words_without_pending_call_are_ignored() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![text_event("Sure.")]);
    let _ = run(runtime.clone(), sessions, turn(), user_text("yes")).await;

    let request = runtime.last_request();
    assert_eq!(request.decision, None);
    assert!(request.resume_parts.is_empty());
    assert_eq!(request.new_message, vec![ContentPart::text("yes")]);
}

#[tokio::test]
async fn failure_outranks_pending_approval() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = ScriptedRuntime::single(vec![
        Ok(relay_core::events::ExecutionEvent::error("agent", "OTHER", "")),
        long_running_call("fc-1", "deploy_service"),
    ]);
    let (result, events) = run(runtime, sessions, turn(), user_text("deploy")).await;
    assert_eq!(result.unwrap(), TaskState::Failed);
    assert!(
        events
            .iter()
            .all(|e| e.state() != Some(TaskState::InputRequired))
    );
}

fn action_ids(event: &ProtocolEvent) -> Vec<String> {
    let ProtocolEvent::StatusUpdate(s) = event else {
        return Vec::new();
    };
    let data = s.status.message.as_ref().unwrap().parts[1]
        .as_data()
        .unwrap()
        .clone();
    data["action_requests"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn every_interrupt_is_shown_and_answered() {
    let sessions = Arc::new(InMemorySessionService::new());
    let first = ScriptedRuntime::single(vec![
        long_running_call("fc1", "delete_file"),
        long_running_call("fc2", "send_email"),
    ]);
    let (result, events) = run(first, sessions.clone(), turn(), user_text("tidy up")).await;
    assert_eq!(result.unwrap(), TaskState::InputRequired);

    let interrupts: Vec<_> = events
        .iter()
        .filter(|e| e.state() == Some(TaskState::InputRequired))
        .collect();
    assert_eq!(interrupts.len(), 3);
    assert_eq!(action_ids(interrupts[0]), vec!["fc1"]);
    assert_eq!(action_ids(interrupts[1]), vec!["fc2"]);
    assert!(interrupts[2].is_final());
    assert_eq!(action_ids(interrupts[2]), vec!["fc1", "fc2"]);

    let second = ScriptedRuntime::single(vec![text_event("Both done.")]);
    let _ = run(
        second.clone(),
        sessions,
        turn().with_first_message(false),
        user_text("approve"),
    )
    .await;
    let request = second.last_request();
    let answered: Vec<&str> = request
        .resume_parts
        .iter()
        .filter_map(|p| match p {
            ContentPart::FunctionResponse { id, .. } => Some(id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(answered, vec!["fc1", "fc2"]);
}
