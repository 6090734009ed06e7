//! Groq LLM Provider
//!
//! Implementation of `LlmProvider` for Groq's OpenAI-compatible chat
//! completions endpoint, plain and streaming, on top of `async-openai`.

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use chat_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, StreamChunk,
        TokenUsage,
    },
    settings::ApiKey,
};
use futures::StreamExt;
use serde::Serialize;

/// Groq provider configuration
#[derive(Clone, Debug)]
pub struct GroqConfig {
    /// API base, without the trailing `/chat/completions`
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".into(),
            model: chat_core::provider::DEFAULT_MODEL.into(),
            timeout_secs: 120,
        }
    }
}

impl GroqConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("GROQ_BASE_URL").unwrap_or(defaults.base_url);
        let model = std::env::var("GROQ_MODEL").unwrap_or(defaults.model);
        let timeout_secs = std::env::var("GROQ_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout_secs,
        }
    }

    /// HTTP client carrying this configuration's request timeout
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("Failed to build LLM client: {e}")))
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Groq LLM provider, bound to one session's API key
pub struct GroqProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl GroqProvider {
    /// Create on top of a shared HTTP client
    pub fn with_client(http: reqwest::Client, api_key: &ApiKey, config: &GroqConfig) -> Self {
        let openai = OpenAIConfig::new()
            .with_api_base(config.base_url.as_str())
            .with_api_key(api_key.expose());

        Self {
            client: Client::with_config(openai).with_http_client(http),
            model: config.model.clone(),
        }
    }

    /// Convert agent messages to request messages
    fn convert_messages(messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>> {
        messages
            .iter()
            .map(|m| -> Result<ChatCompletionRequestMessage> {
                let content = m.content.as_str();
                let message = match m.role {
                    Role::System => ChatCompletionRequestMessage::System(
                        ChatCompletionRequestSystemMessageArgs::default()
                            .content(content)
                            .build()
                            .map_err(map_openai_error)?,
                    ),
                    Role::User => ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(content)
                            .build()
                            .map_err(map_openai_error)?,
                    ),
                    Role::Assistant => ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessageArgs::default()
                            .content(content)
                            .build()
                            .map_err(map_openai_error)?,
                    ),
                };
                Ok(message)
            })
            .collect()
    }

    fn model<'a>(&'a self, options: &'a GenerationOptions) -> &'a str {
        // Options carry the library default; the deployment's choice wins.
        if options.model == chat_core::provider::DEFAULT_MODEL {
            &self.model
        } else {
            &options.model
        }
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CreateChatCompletionRequest> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model(options))
            .messages(Self::convert_messages(messages)?)
            .temperature(options.temperature)
            .top_p(options.top_p)
            .max_completion_tokens(options.max_tokens);
        if !options.stop_sequences.is_empty() {
            args.stop(options.stop_sequences.clone());
        }
        args.build().map_err(map_openai_error)
    }
}

/// Map a finish reason through its wire name
fn finish_reason<R: Serialize>(reason: &R) -> Option<FinishReason> {
    serde_json::to_value(reason)
        .ok()?
        .as_str()
        .map(FinishReason::parse)
}

fn map_openai_error(err: OpenAIError) -> AgentError {
    match err {
        OpenAIError::ApiError(api) => map_api_error(&api),
        OpenAIError::Reqwest(e) if e.is_timeout() || e.is_connect() => {
            AgentError::ProviderUnavailable(e.to_string())
        }
        err @ OpenAIError::StreamError(_) => AgentError::ProviderUnavailable(err.to_string()),
        other => AgentError::Provider(other.to_string()),
    }
}

fn map_api_error(api: &ApiError) -> AgentError {
    let code = api.code.as_deref().unwrap_or_default().to_lowercase();
    let kind = api.r#type.as_deref().unwrap_or_default().to_lowercase();
    let message = api.message.to_lowercase();
    let mentions = |needle: &str| {
        code.contains(needle) || kind.contains(needle) || message.contains(needle)
    };

    if mentions("invalid_api_key") || mentions("invalid api key") || mentions("unauthorized") {
        AgentError::Auth(api.message.clone())
    } else if mentions("rate_limit") || mentions("rate limit") || mentions("too many") {
        AgentError::RateLimited(api.message.clone())
    } else if mentions("server_error") || mentions("unavailable") || mentions("overloaded") {
        AgentError::ProviderUnavailable(api.message.clone())
    } else {
        AgentError::Provider(api.message.clone())
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "Groq"
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = self.build_request(messages, options)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("Response had no choices".into()))?;

        let completion = Completion {
            content: choice.message.content.unwrap_or_default(),
            model: response.model,
            usage,
            finish_reason: choice.finish_reason.as_ref().and_then(finish_reason),
        };
        if let Some(usage) = &completion.usage {
            tracing::debug!(
                model = %completion.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Groq completion"
            );
        }
        Ok(completion)
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let request = self.build_request(messages, options)?;
        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(map_openai_error)?;

        let chunks = stream.map(|item| -> Result<StreamChunk> {
            let response = item.map_err(map_openai_error)?;
            let usage = response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });
            let (delta, done) = response
                .choices
                .into_iter()
                .next()
                .map_or((String::new(), false), |c| {
                    (c.delta.content.unwrap_or_default(), c.finish_reason.is_some())
                });
            Ok(StreamChunk { delta, done, usage })
        });
        Ok(Box::pin(chunks))
    }
}
