//! Cancellation, timeouts, and detached history writes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use relay_core::protocol::{ProtocolEvent, TaskState};
use relay_events::{InMemorySessionService, SessionKey, SessionService};
use relay_runtime::executor::CANCELED_MESSAGE;
use relay_runtime::{ChannelSink, ExecutionEventStream, Executor, ExecutorConfig};
use tokio_util::sync::CancellationToken;

fn hanging_after(items: Vec<RuntimeItem>) -> Arc<ScriptedRuntime> {
    let stream = futures::StreamExt::chain(
        futures::stream::iter(items),
        futures::stream::pending(),
    );
    let stream: ExecutionEventStream = Box::pin(stream);
    ScriptedRuntime::new(vec![stream])
}

async fn wait_for(rx: &mut tokio::sync::mpsc::Receiver<ProtocolEvent>, n: usize) -> Vec<ProtocolEvent> {
    let mut seen = Vec::new();
    while seen.len() < n {
        seen.push(rx.recv().await.unwrap());
    }
    seen
}

#[tokio::test]
async fn explicit_cancel_ends_canceled() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = hanging_after(vec![partial_text("thinking")]);
    let executor = Arc::new(executor(runtime, sessions));
    let cancel = CancellationToken::new();
    let (sink, mut rx) = ChannelSink::new(16);

    let task = {
        let executor = Arc::clone(&executor);
        let turn = turn().with_cancel(cancel.clone());
        tokio::spawn(async move { executor.execute(turn, user_text("go"), &sink).await })
    };

    // Submitted, Working, the partial.
    let _ = wait_for(&mut rx, 3).await;
    cancel.cancel();

    assert_eq!(task.await.unwrap().unwrap(), TaskState::Canceled);
    let last = rx.recv().await.unwrap();
    assert_eq!(last.state(), Some(TaskState::Canceled));
    assert!(last.is_final());
    assert_eq!(status_text(&last), CANCELED_MESSAGE);
}

#[tokio::test(start_paused = true)]
async fn execution_timeout_fails_the_turn() {
    let sessions = Arc::new(InMemorySessionService::new());
    let runtime = hanging_after(vec![]);
    let executor = Executor::new(
        runtime,
        sessions,
        ExecutorConfig {
            execution_timeout: Duration::from_millis(200),
            ..config()
        },
    );
    let sink = RecordingSink::default();

    let state = executor.execute(turn(), user_text("go"), &sink).await.unwrap();

    assert_eq!(state, TaskState::Failed);
    let events = sink.take();
    let last = events.last().unwrap();
    assert!(last.is_final());
    assert_eq!(last.metadata()["error_code"], "EXECUTION_TIMEOUT");
}

#[tokio::test(start_paused = true)]
async fn dropped_caller_does_not_stop_history() {
    let sessions = Arc::new(InMemorySessionService::new());
    let slow = async_stream::stream! {
        yield partial_text("working on it");
        tokio::time::sleep(Duration::from_secs(5)).await;
        yield text_event("finished after the caller left");
    };
    let slow: ExecutionEventStream = Box::pin(slow);
    let runtime = ScriptedRuntime::new(vec![slow]);
    let executor = Arc::new(executor(runtime, sessions.clone()));
    let (sink, mut rx) = ChannelSink::new(16);

    let task = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move { executor.execute(turn(), user_text("go"), &sink).await })
    };
    let _ = wait_for(&mut rx, 3).await;
    task.abort();
    drop(rx);

    tokio::time::sleep(Duration::from_secs(10)).await;

    let session = sessions
        .get_session(&SessionKey::new("relay-test", "user-1", "ctx-1"))
        .await
        .unwrap()
        .unwrap();
    let last = session.events.last().unwrap();
    assert_eq!(last.event.author, "agent");
    assert!(!last.event.partial);
}
