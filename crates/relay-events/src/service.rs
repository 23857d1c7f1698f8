//! The persistence seam the executor writes session history through.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::Result;
use crate::types::{Session, StoredEvent};

/// Identifies one session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
    /// Owning application.
    pub app_name: String,
    /// Owning user.
    pub user_id: String,
    /// Session ID.
    pub session_id: String,
}

impl SessionKey {
    /// Build a key.
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// Options for creating a session.
#[derive(Clone, Debug, Default)]
pub struct CreateSessionOptions {
    /// Display name.
    pub name: Option<String>,
    /// Initial session state.
    pub state: Map<String, Value>,
}

/// Session persistence collaborator.
///
/// Implementations own the session objects; callers hold snapshots.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Look up a session. `Ok(None)` on a miss.
    async fn get_session(&self, key: &SessionKey) -> Result<Option<Session>>;

    /// Create a session. Fails with `AlreadyExists` if the key is taken.
    async fn create_session(
        &self,
        key: &SessionKey,
        options: CreateSessionOptions,
    ) -> Result<Session>;

    /// Append one event to the end of a session's log.
    async fn append_event(&self, key: &SessionKey, event: StoredEvent) -> Result<()>;
}
