//! # chat-runtime
//!
//! Runtime providers for search-chat.
//!
//! ## Providers
//!
//! - **Groq** (default): hosted inference over the OpenAI-compatible
//!   chat completions API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_runtime::groq::{GroqConfig, GroqProvider};
//!
//! let provider = GroqProvider::with_client(http, &api_key, &GroqConfig::from_env());
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .tools(tools)
//!     .build()?;
//! ```

#[cfg(feature = "groq")]
pub mod groq;

#[cfg(feature = "groq")]
pub use groq::{GroqConfig, GroqProvider};

// Re-export core types for convenience
pub use chat_core::{AgentError, LlmProvider, Message, Result, Role};
