//! # chat-core
//!
//! Conversation state and the reason-and-act agent behind search-chat.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Session (per browser)                    │
//! │  ┌──────────────┐  ┌──────────────┐                          │
//! │  │ Conversation │  │   Settings   │                          │
//! │  └──────┬───────┘  └──────┬───────┘                          │
//! │         └──── run_turn ───┘                                  │
//! │                  │                                           │
//! │            Dispatcher ──► Agent (ReAct loop)                 │
//! │                            ├── ToolRegistry                  │
//! │                            └── LlmProvider (Strategy)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` and `Tool` traits keep the loop independent of the hosted
//! model and of the lookup services wired in by the server.

pub mod controller;
pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod settings;
pub mod tool;

pub use controller::{Dispatcher, DispatchOutcome, TurnOutcome, run_turn};
pub use error::{AgentError, FailureKind, Result};
pub use message::{Conversation, Message, Role};
pub use provider::LlmProvider;
pub use reasoning::{Agent, AgentBuilder, AgentConfig, AgentEvent, EventSink};
pub use session::{Session, SessionId, SessionStore, SharedSession};
pub use settings::{ApiKey, Feedback, ResultCount, Settings};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
