//! Backend trait and its tool adapter

use std::sync::Arc;

use async_trait::async_trait;
use chat_core::error::{AgentError, Result};
use chat_core::tool::{Tool, ToolCall, ToolResult, ToolSchema};

use crate::error::{LookupError, LookupResult};

/// A remote lookup service queried with free text
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Tool name the model uses in `Action:`
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// Run a query and render the result as one observation
    async fn lookup(&self, query: &str) -> LookupResult<String>;
}

/// Exposes a `SearchBackend` to the agent as a `Tool`
pub struct LookupTool {
    backend: Arc<dyn SearchBackend>,
}

impl LookupTool {
    pub fn new<B: SearchBackend + 'static>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }
}

#[async_trait]
impl Tool for LookupTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.backend.name().to_string(),
            description: self.backend.description().to_string(),
            category: Some("lookup".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let name = self.backend.name();
        tracing::info!(tool = %name, query = %call.input, "Lookup");

        match self.backend.lookup(call.input.trim()).await {
            Ok(text) => Ok(ToolResult::success(name, text)),
            Err(e) => {
                if e.is_transient() {
                    tracing::warn!(tool = %name, error = %e, "Lookup service unavailable");
                } else {
                    tracing::debug!(tool = %name, error = %e, "Lookup failed");
                }
                Err(AgentError::ToolExecution(e.to_string()))
            }
        }
    }
}

/// Backend returning a canned answer or a canned failure
pub struct StaticBackend {
    name: String,
    description: String,
    response: std::result::Result<String, String>,
}

impl StaticBackend {
    pub fn new(name: impl Into<String>, response: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("Canned answers for {name}"),
            name,
            response: Ok(response.into()),
        }
    }

    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("Always failing {name}"),
            name,
            response: Err(message.into()),
        }
    }
}

#[async_trait]
impl SearchBackend for StaticBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn lookup(&self, _query: &str) -> LookupResult<String> {
        self.response.clone().map_err(|message| LookupError::Unavailable {
            service: "static",
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_tool_success() {
        let tool = LookupTool::new(StaticBackend::new("wikipedia", "Page: Rust\nSummary: A language"));
        assert_eq!(tool.schema().name, "wikipedia");

        let result = tool
            .execute(&ToolCall::new("wikipedia", "  rust language "))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.name, "wikipedia");
        assert!(result.output.starts_with("Page: Rust"));
    }

    #[tokio::test]
    async fn test_lookup_tool_failure_is_tool_execution() {
        let tool = LookupTool::new(StaticBackend::failing("Search", "blocked"));
        let err = tool.execute(&ToolCall::new("Search", "news")).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolExecution(msg) if msg.contains("blocked")));
    }
}
