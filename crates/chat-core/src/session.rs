//! Session Management
//!
//! One `Session` per browser session: its conversation and its settings.
//! Sessions live only in memory and share nothing with each other.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::message::Conversation;
use crate::settings::Settings;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-session context handed to every handler
#[derive(Clone, Debug)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Conversation history
    pub conversation: Conversation,

    /// Credential and preferences
    pub settings: Settings,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session with a fresh greeting
    pub fn new(settings: Settings) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            conversation: Conversation::new(),
            settings,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Reset the conversation to a single greeting
    pub fn reset(&mut self) {
        self.conversation.reset();
        self.touch();
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    /// Time since last activity
    pub fn idle_for(&self) -> TimeDelta {
        Utc::now() - self.updated_at
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

/// A session behind its own lock. Holding the lock for a whole turn keeps
/// turns in one session strictly sequential.
pub type SharedSession = Arc<Mutex<Session>>;

/// In-memory registry of live sessions
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and return its handle
    pub async fn create(&self, settings: Settings) -> (SessionId, SharedSession) {
        let session = Session::new(settings);
        let id = session.id.clone();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id.clone(), Arc::clone(&shared));
        tracing::debug!(session = %id, "Session created");
        (id, shared)
    }

    /// Look up a session
    pub async fn get(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// End a session. Returns whether it existed.
    pub async fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(session = %id, "Session ended");
        }
        removed
    }

    /// Drop sessions idle longer than `max_idle`. Sessions in the middle of a
    /// turn are locked and therefore skipped.
    pub async fn prune_idle(&self, max_idle: std::time::Duration) -> usize {
        let max_idle = TimeDelta::from_std(max_idle).unwrap_or_else(|_| TimeDelta::weeks(5200));
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            session
                .try_lock()
                .map_or(true, |s| s.idle_for() <= max_idle)
        });
        before - sessions.len()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::message::GREETING;

    #[test]
    fn test_session_creation() {
        let session = Session::default();
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.conversation.all()[0].content, GREETING);
        assert!(!session.settings.has_api_key());
    }

    #[tokio::test]
    async fn test_store_create_get_remove() {
        let store = SessionStore::new();
        let (id, shared) = store.create(Settings::default()).await;

        assert_eq!(shared.lock().await.id, id);
        assert!(store.get(&id).await.is_some());
        assert_eq!(store.len().await, 1);

        assert!(store.remove(&id).await);
        assert!(!store.remove(&id).await);
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let (_, a) = store.create(Settings::default()).await;
        let (_, b) = store.create(Settings::default()).await;

        a.lock().await.conversation.append(
            crate::message::Message::new(crate::message::Role::User, "only in a").unwrap(),
        );

        assert_eq!(a.lock().await.message_count(), 2);
        assert_eq!(b.lock().await.message_count(), 1);
    }

    #[tokio::test]
    async fn test_prune_idle_skips_busy_sessions() {
        let store = SessionStore::new();
        let (idle_id, idle) = store.create(Settings::default()).await;
        let (busy_id, busy) = store.create(Settings::default()).await;

        idle.lock().await.updated_at = Utc::now() - TimeDelta::hours(2);
        busy.lock().await.updated_at = Utc::now() - TimeDelta::hours(2);
        let guard = busy.lock().await;

        let pruned = store.prune_idle(Duration::from_secs(3600)).await;
        drop(guard);

        assert_eq!(pruned, 1);
        assert!(store.get(&idle_id).await.is_none());
        assert!(store.get(&busy_id).await.is_some());
    }
}
