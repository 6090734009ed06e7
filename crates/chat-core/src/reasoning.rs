//! Reasoning Loop
//!
//! Zero-shot ReAct: the model reasons about the question, picks an action
//! (a tool call or the final answer), observes the tool output and repeats.
//! Malformed model output is fed back as an observation instead of failing
//! the turn. Only an exhausted step budget or a provider error ends the loop
//! early.

use std::sync::{Arc, LazyLock};

use futures::StreamExt;
use regex::Regex;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{AgentError, Result};
use crate::message::{Message, Role};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{Tool, ToolCall, ToolRegistry, ToolResult};

const FINAL_ANSWER: &str = "Final Answer:";
const OBSERVATION: &str = "\nObservation:";

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("valid action regex")
});

static ACTION_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action\s*\d*\s*:").expect("valid action line regex"));

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Instructions placed before the tool list
    pub prefix: String,

    /// Maximum reasoning iterations before giving up
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
            max_iterations: 15,
            generation: GenerationOptions {
                stop_sequences: vec![OBSERVATION.into()],
                ..GenerationOptions::default()
            },
        }
    }
}

const DEFAULT_PREFIX: &str =
    "You are a helpful research assistant. Answer the user's question as well as you can. \
     You have access to the following tools:";

const FORMAT_INSTRUCTIONS: &str = r"Use the following format:

Question: the input question you must answer
Thought: think about what to do next
Action: the action to take, exactly one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (Thought/Action/Action Input/Observation may repeat several times)
Thought: I now know the final answer
Final Answer: the final answer to the original question

Never write an Observation yourself. Either give an Action with an Action Input, or a Final Answer, never both.";

/// Progress reported while a turn runs
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Raw text delta from the model
    Token { delta: String },
    /// Reasoning text preceding an action or answer
    Thought { text: String },
    /// Tool about to be called
    Action { tool: String, input: String },
    /// Tool output fed back to the model
    Observation { tool: String, output: String, success: bool },
    /// Model output that could not be parsed
    ParseError { message: String },
    /// Final answer
    Answer { text: String },
}

/// Receiver side is owned by whoever renders progress
pub type EventSink = UnboundedSender<AgentEvent>;

fn emit(events: Option<&EventSink>, event: AgentEvent) {
    if let Some(tx) = events {
        // Receiver gone means nobody is watching; the turn still completes.
        let _ = tx.send(event);
    }
}

/// One parsed model step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentStep {
    Action { thought: String, call: ToolCall },
    Finish { thought: String, answer: String },
}

/// Parse one model output into an action or a final answer
pub fn parse_step(text: &str) -> Result<AgentStep> {
    let answer_at = text.find(FINAL_ANSWER);

    if let Some(caps) = ACTION_RE.captures(text) {
        if answer_at.is_some() {
            return Err(AgentError::Parse(
                "Output contains both a final answer and an action".into(),
            ));
        }
        let whole = caps.get(0).map_or(0, |m| m.start());
        let name = caps.get(1).map_or("", |m| m.as_str()).trim();
        let input = caps
            .get(2)
            .map_or("", |m| m.as_str())
            .trim()
            .trim_matches('"')
            .trim();
        if name.is_empty() {
            return Err(AgentError::Parse("Missing tool name after 'Action:'".into()));
        }
        return Ok(AgentStep::Action {
            thought: text[..whole].trim().to_string(),
            call: ToolCall::new(name, input),
        });
    }

    if let Some(at) = answer_at {
        let answer = text[at + FINAL_ANSWER.len()..].trim();
        if answer.is_empty() {
            return Err(AgentError::Parse("Empty 'Final Answer:'".into()));
        }
        return Ok(AgentStep::Finish {
            thought: text[..at].trim().to_string(),
            answer: answer.to_string(),
        });
    }

    if ACTION_LINE_RE.is_match(text) {
        Err(AgentError::Parse("Missing 'Action Input:' after 'Action:'".into()))
    } else {
        Err(AgentError::Parse("Missing 'Action:' after 'Thought:'".into()))
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Build the system prompt: prefix, tool list, format instructions
    fn build_system_prompt(&self) -> String {
        let names = self.tools.names().join(", ");
        format!(
            "{}\n\n{}\n\n{}",
            self.config.prefix,
            self.tools.describe(),
            FORMAT_INSTRUCTIONS.replace("{tool_names}", &names)
        )
    }

    /// Build the per-step prompt: earlier turns, the question, the scratchpad
    fn build_step_prompt(transcript: &str, question: &str, scratchpad: &str) -> String {
        let mut prompt = String::new();
        if !transcript.is_empty() {
            prompt.push_str("Conversation so far:\n");
            prompt.push_str(transcript);
            prompt.push_str("\n\n");
        }
        prompt.push_str("Begin!\n\nQuestion: ");
        prompt.push_str(question);
        prompt.push_str("\nThought:");
        prompt.push_str(scratchpad);
        prompt
    }

    /// Run the loop over a conversation history and return the final answer.
    ///
    /// The last user message is the question; everything before it is
    /// context.
    pub async fn run(&self, history: &[Message], events: Option<&EventSink>) -> Result<String> {
        let question_at = history
            .iter()
            .rposition(|m| m.role == Role::User)
            .ok_or_else(|| AgentError::InvalidMessage("history has no user question".into()))?;
        let question = &history[question_at].content;
        let transcript = history[..question_at]
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let system = Message::system(self.build_system_prompt());
        let mut scratchpad = String::new();

        for iteration in 1..=self.config.max_iterations {
            let prompt = Self::build_step_prompt(&transcript, question, &scratchpad);
            let messages = [system.clone(), Message::user(prompt)];

            let raw = self.generate(&messages, events).await?;
            let output = strip_observation(&raw);
            tracing::debug!(iteration, provider = self.provider.name(), "Agent step");

            let observation = match parse_step(output) {
                Ok(AgentStep::Finish { thought, answer }) => {
                    if !thought.is_empty() {
                        emit(events, AgentEvent::Thought { text: thought });
                    }
                    emit(events, AgentEvent::Answer { text: answer.clone() });
                    return Ok(answer);
                }
                Ok(AgentStep::Action { thought, call }) => {
                    if !thought.is_empty() {
                        emit(events, AgentEvent::Thought { text: thought });
                    }
                    emit(
                        events,
                        AgentEvent::Action {
                            tool: call.name.clone(),
                            input: call.input.clone(),
                        },
                    );
                    let result = self.execute_tool(&call).await;
                    emit(
                        events,
                        AgentEvent::Observation {
                            tool: result.name.clone(),
                            output: result.output.clone(),
                            success: result.success,
                        },
                    );
                    Self::format_tool_result(&result)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Unparseable agent step, asking for a correction");
                    emit(events, AgentEvent::ParseError { message: e.to_string() });
                    format!(
                        "Invalid or incomplete response. {e}. Reply with either an Action and Action Input, or a Final Answer."
                    )
                }
            };

            scratchpad.push_str(output);
            scratchpad.push_str(OBSERVATION);
            scratchpad.push(' ');
            scratchpad.push_str(&observation);
            scratchpad.push_str("\nThought:");
        }

        Err(AgentError::MaxIterations(self.config.max_iterations))
    }

    /// One model call. Streams when someone is listening for tokens.
    async fn generate(&self, messages: &[Message], events: Option<&EventSink>) -> Result<String> {
        if events.is_none() {
            let completion = self
                .provider
                .complete(messages, &self.config.generation)
                .await?;
            return Ok(completion.content);
        }

        let mut stream = self
            .provider
            .complete_stream(messages, &self.config.generation)
            .await?;
        let mut content = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if !chunk.delta.is_empty() {
                content.push_str(&chunk.delta);
                emit(events, AgentEvent::Token { delta: chunk.delta });
            }
            if chunk.done {
                break;
            }
        }
        Ok(content)
    }

    /// Execute a tool call. Failures become observations, never errors.
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.tools.get(&call.name) else {
            let valid = self.tools.names().join(", ");
            return ToolResult::failure(
                call.name.clone(),
                format!("{} is not a valid tool, try one of [{valid}].", call.name),
            );
        };

        let outcome = match tool.validate(call) {
            Ok(()) => tool.execute(call).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool failed, continuing without it");
                ToolResult::failure(
                    call.name.clone(),
                    format!("{} is unavailable right now: {e}", call.name),
                )
            }
        }
    }

    /// Format tool result for the scratchpad
    fn format_tool_result(result: &ToolResult) -> String {
        if result.success {
            result.output.clone()
        } else {
            format!("[{} failed] {}", result.name, result.output)
        }
    }
}

/// Cut a hallucinated observation the stop sequence did not catch
fn strip_observation(output: &str) -> &str {
    output
        .find(OBSERVATION)
        .map_or(output, |at| &output[..at])
        .trim_end()
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        if self.config.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }

        Ok(Agent::new(provider, Arc::new(self.tools), self.config))
    }
}
