//! In-memory [`SessionService`].
//!
//! Sessions live in a map behind a `parking_lot::RwLock`. Lookups return
//! clones, so no lock is ever held across an await point.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::errors::{Result, SessionError};
use crate::service::{CreateSessionOptions, SessionKey, SessionService};
use crate::types::{Session, StoredEvent};

/// Process-local session storage.
#[derive(Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl InMemorySessionService {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn get_session(&self, key: &SessionKey) -> Result<Option<Session>> {
        Ok(self.sessions.read().get(key).cloned())
    }

    async fn create_session(
        &self,
        key: &SessionKey,
        options: CreateSessionOptions,
    ) -> Result<Session> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(key) {
            return Err(SessionError::AlreadyExists(key.session_id.clone()));
        }
        let session = Session {
            id: key.session_id.clone(),
            user_id: key.user_id.clone(),
            app_name: key.app_name.clone(),
            name: options.name,
            state: options.state,
            events: Vec::new(),
        };
        let _ = sessions.insert(key.clone(), session.clone());
        debug!(session_id = %key.session_id, "session created");
        Ok(session)
    }

    async fn append_event(&self, key: &SessionKey, event: StoredEvent) -> Result<()> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| SessionError::NotFound(key.session_id.clone()))?;
        session.events.push(event);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use relay_core::content::ContentPart;
    use relay_core::events::ExecutionEvent;

    fn key() -> SessionKey {
        SessionKey::new("relay", "user-1", "ctx-1")
    }

    #[tokio::test]
    async fn get_miss_is_none() {
        let svc = InMemorySessionService::new();
        assert!(svc.get_session(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_then_get() {
        let svc = InMemorySessionService::new();
        let created = svc
            .create_session(
                &key(),
                CreateSessionOptions {
                    name: Some("Plan a trip...".into()),
                    ..CreateSessionOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.id, "ctx-1");

        let fetched = svc.get_session(&key()).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(svc.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let svc = InMemorySessionService::new();
        let _ = svc
            .create_session(&key(), CreateSessionOptions::default())
            .await
            .unwrap();
        let err = svc
            .create_session(&key(), CreateSessionOptions::default())
            .await
            .unwrap_err();
        assert_matches!(err, SessionError::AlreadyExists(id) if id == "ctx-1");
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let svc = InMemorySessionService::new();
        let _ = svc
            .create_session(&key(), CreateSessionOptions::default())
            .await
            .unwrap();
        svc.append_event(&key(), StoredEvent::header("inv", vec![ContentPart::text("hi")]))
            .await
            .unwrap();
        svc.append_event(
            &key(),
            StoredEvent::execution(ExecutionEvent::new("assistant", vec![ContentPart::text("yo")])),
        )
        .await
        .unwrap();

        let session = svc.get_session(&key()).await.unwrap().unwrap();
        let authors: Vec<_> = session.events.iter().map(|e| e.event.author.as_str()).collect();
        assert_eq!(authors, vec!["user", "assistant"]);
    }

    #[tokio::test]
    async fn append_to_missing_session_fails() {
        let svc = InMemorySessionService::new();
        let err = svc
            .append_event(&key(), StoredEvent::header("inv", vec![]))
            .await
            .unwrap_err();
        assert_matches!(err, SessionError::NotFound(_));
    }

    #[tokio::test]
    async fn keys_are_scoped_by_user() {
        let svc = InMemorySessionService::new();
        let _ = svc
            .create_session(&key(), CreateSessionOptions::default())
            .await
            .unwrap();
        let other = SessionKey::new("relay", "user-2", "ctx-1");
        assert!(svc.get_session(&other).await.unwrap().is_none());
    }
}
