//! Application State

use std::sync::Arc;

use chat_core::{Dispatcher, SessionStore};

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Live sessions, one per browser
    pub sessions: Arc<SessionStore>,

    /// Answers questions (the Groq-backed agent outside of tests)
    pub dispatcher: Arc<dyn Dispatcher>,

    /// Environment-derived settings
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, config: ServerConfig) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            dispatcher,
            config: Arc::new(config),
        }
    }
}
