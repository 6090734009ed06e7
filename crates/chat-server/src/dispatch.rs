//! Groq-backed dispatcher
//!
//! Builds a fresh provider, tool set and agent for every turn from the
//! session's current settings, so a changed key or result count applies to
//! the very next question.

use std::sync::Arc;

use async_trait::async_trait;
use chat_core::{
    error::{AgentError, Result},
    message::Message,
    reasoning::{AgentBuilder, EventSink},
    settings::Settings,
    Dispatcher,
};
use chat_runtime::{GroqConfig, GroqProvider};

use crate::config::ServerConfig;

/// Zero-shot ReAct agent over Groq with the web, arXiv and Wikipedia tools
pub struct ReactDispatcher {
    http: reqwest::Client,
    llm_http: reqwest::Client,
    groq: GroqConfig,
    max_iterations: usize,
}

impl ReactDispatcher {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.tool_timeout)
            .user_agent(concat!("search-chat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let llm_http = config.groq.http_client()?;

        Ok(Self {
            http,
            llm_http,
            groq: config.groq.clone(),
            max_iterations: config.max_iterations,
        })
    }
}

#[async_trait]
impl Dispatcher for ReactDispatcher {
    async fn dispatch(
        &self,
        history: &[Message],
        settings: &Settings,
        events: Option<&EventSink>,
    ) -> Result<String> {
        let api_key = settings
            .api_key
            .as_ref()
            .ok_or(AgentError::MissingCredential)?;

        let provider = GroqProvider::with_client(self.llm_http.clone(), api_key, &self.groq);
        let tools = search_tools::toolset(&self.http, settings.result_count);

        let agent = AgentBuilder::new()
            .provider(Arc::new(provider))
            .tools(tools)
            .model(self.groq.model.clone())
            .max_iterations(self.max_iterations)
            .build()?;

        tracing::debug!(
            model = %self.groq.model,
            result_count = settings.result_count.get(),
            history = history.len(),
            approx_tokens = history.iter().map(Message::estimate_tokens).sum::<u32>(),
            "Dispatching turn"
        );

        agent.run(history, events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_without_key_fails_fast() {
        let dispatcher = ReactDispatcher::new(&ServerConfig::default()).unwrap();
        let history = [Message::new(chat_core::Role::User, "What is 2+2?").unwrap()];

        let err = dispatcher
            .dispatch(&history, &Settings::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingCredential));
    }
}
