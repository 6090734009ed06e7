//! Error Types

use serde::Serialize;
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Maximum iterations reached in reasoning loop
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Model output could not be parsed into an action or answer
    #[error("Parse error: {0}")]
    Parse(String),

    /// Message rejected at construction
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// No credential configured for the session
    #[error("Missing API key")]
    MissingCredential,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a failed turn, safe to show to the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Credential missing or rejected upstream
    Credential,
    /// Model endpoint unreachable or erroring
    Unavailable,
    /// Upstream quota hit
    RateLimited,
    /// Reasoning loop ran out of steps
    StepBudget,
    /// Model output unusable
    MalformedOutput,
    /// Anything else
    Internal,
}

impl FailureKind {
    /// Short hint rendered under the apology, never persisted
    pub const fn hint(self) -> &'static str {
        match self {
            Self::Credential => "Check that your Groq API key is valid.",
            Self::Unavailable => "The language model service could not be reached.",
            Self::RateLimited => "The language model service is rate limiting requests.",
            Self::StepBudget => "The question needed too many steps. Try a simpler one.",
            Self::MalformedOutput => "The model produced an unusable response.",
            Self::Internal => "An unexpected error occurred.",
        }
    }
}

impl AgentError {
    /// Classify for the dispatch boundary
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Auth(_) | Self::MissingCredential => FailureKind::Credential,
            Self::ProviderUnavailable(_) => FailureKind::Unavailable,
            Self::RateLimited(_) => FailureKind::RateLimited,
            Self::MaxIterations(_) => FailureKind::StepBudget,
            Self::Parse(_) | Self::Json(_) => FailureKind::MalformedOutput,
            _ => FailureKind::Internal,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::InvalidMessage(msg) => format!("Invalid message: {msg}"),
            Self::MissingCredential => crate::controller::CREDENTIAL_PROMPT.into(),
            other => other.failure_kind().hint().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_mapping() {
        assert_eq!(AgentError::Auth("401".into()).failure_kind(), FailureKind::Credential);
        assert_eq!(
            AgentError::ProviderUnavailable("timeout".into()).failure_kind(),
            FailureKind::Unavailable
        );
        assert_eq!(AgentError::MaxIterations(15).failure_kind(), FailureKind::StepBudget);
        assert_eq!(
            AgentError::ToolExecution("boom".into()).failure_kind(),
            FailureKind::Internal
        );
    }

    #[test]
    fn test_user_message_hides_raw_error() {
        let err = AgentError::Provider("upstream said: secret details".into());
        assert!(!err.user_message().contains("secret details"));
    }
}
