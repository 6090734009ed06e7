//! Conversation Messages
//!
//! The message log shown to the user. Insertion order is chronological order
//! is display order, and the first entry is always the greeting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Greeting that opens every conversation
pub const GREETING: &str = "Hi, I'm a chatbot who can search the web. How can I help you?";

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Prompt instructions (only sent to the model, never stored)
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    pub content: String,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message, rejecting empty content
    pub fn new(role: Role, content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(AgentError::InvalidMessage(format!(
                "{role} message content must not be empty"
            )));
        }
        Ok(Self::unchecked(role, content))
    }

    fn unchecked(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// System prompt built by the agent itself
    pub(crate) fn system(content: impl Into<String>) -> Self {
        Self::unchecked(Role::System, content)
    }

    /// User prompt built by the agent itself
    pub(crate) fn user(content: impl Into<String>) -> Self {
        Self::unchecked(Role::User, content)
    }

    /// Assistant text owned by this crate (greeting, apology)
    pub(crate) fn assistant(content: impl Into<String>) -> Self {
        Self::unchecked(Role::Assistant, content)
    }

    /// Estimate token count (rough approximation)
    pub fn estimate_tokens(&self) -> u32 {
        // ~4 characters per token, +4 for role overhead
        u32::try_from(self.content.len() / 4).unwrap_or(u32::MAX).saturating_add(4)
    }
}

/// Ordered conversation log for one session
#[derive(Clone, Debug, Serialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Start a conversation with the greeting
    pub fn new() -> Self {
        Self {
            messages: vec![Message::assistant(GREETING)],
        }
    }

    /// Drop everything and start over with a fresh greeting
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(Message::assistant(GREETING));
    }

    /// Add a message to the end
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get all messages in display order
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::new(Role::User, "Hello").unwrap();
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_empty_message_rejected() {
        assert!(matches!(
            Message::new(Role::User, "   \n"),
            Err(AgentError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_new_conversation_has_greeting() {
        let conv = Conversation::new();
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.all()[0].role, Role::Assistant);
        assert_eq!(conv.all()[0].content, GREETING);
    }

    #[test]
    fn test_reset_leaves_only_greeting() {
        let mut conv = Conversation::new();
        for i in 0..5 {
            conv.append(Message::new(Role::User, format!("q{i}")).unwrap());
            conv.append(Message::new(Role::Assistant, format!("a{i}")).unwrap());
        }
        assert_eq!(conv.len(), 11);

        conv.reset();
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.last().unwrap().content, GREETING);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = Message::new(Role::Assistant, "4").unwrap();
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "4");
    }
}
