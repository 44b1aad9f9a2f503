#![deny(missing_docs)]
//! Tool interface and registry for codemode.
//!
//! Defines the [`ToolDyn`] trait for object-safe tool abstraction and
//! [`ToolRegistry`] for managing collections of tools. Any tool source
//! (the sandbox meta-tool, a bridged MCP tool) implements [`ToolDyn`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use codemode_types::ContentBlock;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from tool operations.
///
/// Returning an error from [`ToolDyn::call`] aborts the agent turn —
/// failures the model is meant to see and recover from are expressed as
/// an ordinary [`ToolOutput`] instead.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found in the registry.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Tool execution failed unrecoverably.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Output from a tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Content items surfaced to the model.
    pub content: Vec<ContentBlock>,
    /// Whether this output represents an error the model should adapt to.
    pub is_error: bool,
}

impl ToolOutput {
    /// A successful output holding one text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        }
    }

    /// An error output holding one text block. The model sees it and
    /// may retry; the turn continues.
    pub fn error_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: true,
        }
    }

    /// Concatenated text of all text blocks.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runtime context provided to tools during execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Token for cooperative cancellation of long-running tools.
    pub cancellation_token: CancellationToken,
}

/// Object-safe trait for tool implementations.
///
/// Tools are stored as `Arc<dyn ToolDyn>` in [`ToolRegistry`].
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given input.
    fn call<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>>;
}

/// A tool the model calls to end its turn. It has a schema but no
/// executable body — the loop never dispatches it.
#[derive(Debug, Clone)]
pub struct TerminalTool {
    /// The tool name.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: serde_json::Value,
}

/// Registry of tools available to a turn.
///
/// Holds tools as `Arc<dyn ToolDyn>` keyed by name. The agent loop uses
/// this to look up and execute tools requested by the model. Terminal
/// tools are registered separately: they are advertised alongside the
/// executable tools but a call to one ends the turn instead of running
/// anything.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
    terminal: Vec<TerminalTool>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            terminal: Vec::new(),
        }
    }

    /// Register a tool. Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        tracing::debug!(tool = tool.name(), "registering tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Register a terminal tool.
    pub fn register_terminal(&mut self, tool: TerminalTool) {
        self.terminal.push(tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolDyn>> {
        self.tools.get(name)
    }

    /// Whether the name is a registered terminal tool.
    pub fn is_terminal(&self, name: &str) -> bool {
        self.terminal.iter().any(|t| t.name == name)
    }

    /// Iterate over all registered tools.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ToolDyn>> {
        self.tools.values()
    }

    /// Iterate over the terminal tools.
    pub fn terminal_tools(&self) -> impl Iterator<Item = &TerminalTool> {
        self.terminal.iter()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn tool_dyn_is_object_safe() {
        _assert_send_sync::<Arc<dyn ToolDyn>>();
    }

    #[test]
    fn tool_error_display() {
        assert_eq!(
            ToolError::NotFound("execute_rust_code".into()).to_string(),
            "tool not found: execute_rust_code"
        );
        assert_eq!(
            ToolError::ExecutionFailed("driver exit 3".into()).to_string(),
            "execution failed: driver exit 3"
        );
    }

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input back"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call<'a>(
            &'a self,
            input: serde_json::Value,
            _ctx: &'a ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>> {
            Box::pin(async move { Ok(ToolOutput::text(input.to_string())) })
        }
    }

    #[tokio::test]
    async fn registry_registers_and_calls() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);

        let tool = registry.get("echo").expect("echo registered");
        let ctx = ToolContext::default();
        let out = tool.call(json!({"x": 1}), &ctx).await.unwrap();
        assert!(!out.is_error);
        assert_eq!(out.joined_text(), "{\"x\":1}");
    }

    #[test]
    fn terminal_tools_are_tracked_separately() {
        let mut registry = ToolRegistry::new();
        registry.register_terminal(TerminalTool {
            name: "final_answer".into(),
            description: "Finish the task".into(),
            input_schema: json!({"type": "object"}),
        });
        assert!(registry.is_terminal("final_answer"));
        assert!(!registry.is_terminal("echo"));
        assert!(registry.get("final_answer").is_none());
        assert_eq!(registry.terminal_tools().count(), 1);
    }

    #[test]
    fn tool_output_helpers() {
        let ok = ToolOutput::text("done");
        assert!(!ok.is_error);
        let err = ToolOutput::error_text("invalid parameters");
        assert!(err.is_error);
        assert_eq!(err.joined_text(), "invalid parameters");
    }
}
