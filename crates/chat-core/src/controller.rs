//! Turn Controller
//!
//! Sequences one user turn against a session: credential check, user message,
//! dispatch, reply. Every dispatcher failure ends up as the same apology in
//! the conversation; the failure kind travels alongside for the UI but is
//! never persisted.

use async_trait::async_trait;

use crate::error::{FailureKind, Result};
use crate::message::{Message, Role};
use crate::reasoning::EventSink;
use crate::session::Session;
use crate::settings::{ApiKey, Feedback, ResultCount, Settings};

/// Reply appended when a turn fails for any reason
pub const APOLOGY: &str =
    "Sorry, something went wrong while processing your request. Please try again.";

/// Shown instead of running a turn when no API key is set
pub const CREDENTIAL_PROMPT: &str = "Please enter your Groq API key to use the search chat.";

/// Produces an answer for the latest user message in `history`
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        history: &[Message],
        settings: &Settings,
        events: Option<&EventSink>,
    ) -> Result<String>;
}

/// Result of the dispatch boundary
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Answered(String),
    Failed(FailureKind),
}

/// Call the dispatcher and fold every error into a `FailureKind`
pub async fn dispatch_turn(
    dispatcher: &dyn Dispatcher,
    history: &[Message],
    settings: &Settings,
    events: Option<&EventSink>,
) -> DispatchOutcome {
    match dispatcher.dispatch(history, settings, events).await {
        Ok(answer) if !answer.trim().is_empty() => DispatchOutcome::Answered(answer),
        Ok(_) => {
            tracing::warn!("Dispatcher returned an empty answer");
            DispatchOutcome::Failed(FailureKind::MalformedOutput)
        }
        Err(e) => {
            let kind = e.failure_kind();
            tracing::warn!(?kind, error = %e, "Turn failed");
            DispatchOutcome::Failed(kind)
        }
    }
}

/// What a submitted turn did to the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// No credential; the conversation is untouched
    MissingCredential,
    /// User message and reply were appended
    Completed {
        reply: Message,
        failure: Option<FailureKind>,
    },
}

/// Run one turn against a session.
///
/// Empty input is rejected with `InvalidMessage` before anything is appended.
pub async fn run_turn(
    session: &mut Session,
    input: &str,
    dispatcher: &dyn Dispatcher,
    events: Option<&EventSink>,
) -> Result<TurnOutcome> {
    if !session.settings.has_api_key() {
        return Ok(TurnOutcome::MissingCredential);
    }

    let question = Message::new(Role::User, input)?;
    session.conversation.append(question);
    session.touch();

    let outcome = dispatch_turn(
        dispatcher,
        session.conversation.all(),
        &session.settings,
        events,
    )
    .await;

    let (reply, failure) = match outcome {
        DispatchOutcome::Answered(text) => (Message::assistant(text), None),
        DispatchOutcome::Failed(kind) => (Message::assistant(APOLOGY), Some(kind)),
    };
    session.conversation.append(reply.clone());
    session.touch();

    Ok(TurnOutcome::Completed { reply, failure })
}

/// Apply a settings update from the panel
pub fn update_settings(
    session: &mut Session,
    api_key: Option<String>,
    result_count: Option<i64>,
) {
    if let Some(key) = api_key {
        session.settings.api_key = ApiKey::new(key);
    }
    if let Some(count) = result_count {
        session.settings.result_count = ResultCount::new(count);
    }
    session.touch();
}

/// Feedback is acknowledged and otherwise dropped
pub fn acknowledge_feedback(feedback: Feedback) -> String {
    feedback.acknowledgement()
}
