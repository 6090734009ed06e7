//! Tool System
//!
//! Lookup tools the reasoning loop may call. Every tool takes one free-text
//! input and returns a text observation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Tool call parsed from the model's `Action` / `Action Input` lines
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Free-text input
    pub input: String,

}

impl ToolCall {
    pub fn new(name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
        }
    }
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (snippet or error)
    pub output: String,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            output: error.into(),
        }
    }
}

/// Tool definition shown to the model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for the prompt
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given input
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Validate input before execution (optional)
    fn validate(&self, call: &ToolCall) -> Result<()> {
        if call.input.trim().is_empty() {
            return Err(AgentError::ToolValidation(format!(
                "{} needs a non-empty input",
                call.name
            )));
        }
        Ok(())
    }
}

/// Registry for available tools, kept in registration order
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn Tool>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_boxed(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_boxed(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        match self.tools.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = tool,
            None => self.tools.push((name, tool)),
        }
    }

    /// Get a tool by name. Matching ignores case and surrounding whitespace
    /// since models are loose about how they spell the action.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let name = name.trim();
        self.tools
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, tool)| Arc::clone(tool))
    }

    /// Get all tool schemas
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|(_, t)| t.schema()).collect()
    }

    /// Get tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// `name: description` lines for the prompt
    pub fn describe(&self) -> String {
        self.schemas()
            .iter()
            .map(|s| format!("{}: {}", s.name, s.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool(&'static str);

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.0.into(),
                description: format!("Echoes input for {}", self.0),
                category: None,
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            Ok(ToolResult::success(self.0, call.input.clone()))
        }
    }

    #[test]
    fn test_tool_registry_order_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool("Search"));
        registry.register(EchoTool("arxiv"));
        registry.register(EchoTool("wikipedia"));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), vec!["Search", "arxiv", "wikipedia"]);
        assert!(registry.get(" search ").is_some());
        assert!(registry.get("Wikipedia").is_some());
        assert!(registry.get("unknown").is_none());
        assert!(registry.describe().starts_with("Search: Echoes input"));
    }

    #[test]
    fn test_default_validation_rejects_blank_input() {
        let tool = EchoTool("arxiv");
        let err = tool.validate(&ToolCall::new("arxiv", "  ")).unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
        assert!(tool.validate(&ToolCall::new("arxiv", "attention")).is_ok());
    }

    #[test]
    fn test_tool_call_wire_shape() {
        let call = ToolCall::new("wikipedia", "Alan Turing");
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "wikipedia", "input": "Alan Turing" }));

        let result = serde_json::to_value(ToolResult::success("wikipedia", "Page: Alan Turing")).unwrap();
        assert_eq!(
            result,
            serde_json::json!({ "name": "wikipedia", "success": true, "output": "Page: Alan Turing" })
        );
    }
}
