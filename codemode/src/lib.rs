#![deny(missing_docs)]
//! # codemode — umbrella crate
//!
//! Provides a single import surface for the codemode system: the shared
//! data model, the provider and tool seams, and — behind feature flags —
//! the code generator, the sandbox engine, the event bus, and the MCP
//! plumbing. Plus a `prelude` for the happy path.

pub use codemode_tool;
pub use codemode_turn;
pub use codemode_types;

#[cfg(feature = "events")]
pub use codemode_agent;
#[cfg(feature = "events")]
pub use codemode_events;
#[cfg(feature = "exec")]
pub use codemode_exec;
#[cfg(feature = "exec")]
pub use codemode_gen;
#[cfg(feature = "mcp")]
pub use codemode_mcp;

/// Happy-path imports for composing a codemode system.
pub mod prelude {
    pub use codemode_tool::{TerminalTool, ToolContext, ToolDyn, ToolError, ToolOutput, ToolRegistry};
    pub use codemode_turn::{Provider, ProviderError, ProviderRequest, ProviderResponse};
    pub use codemode_types::{
        CodeModeServer, ContentBlock, ExecError, ExecutionRequest, ServerTransport, ToolCatalog,
        ToolDescriptor,
    };

    #[cfg(feature = "events")]
    pub use codemode_agent::{EmitterConfig, EmittingProvider, LoopConfig, ToolLoop};
    #[cfg(feature = "events")]
    pub use codemode_events::{Event, EventClient, EventKind, EventServer, EventWriter};
    #[cfg(feature = "exec")]
    pub use codemode_exec::{Engine, EngineConfig, ExecuteCodeTool};
    #[cfg(feature = "exec")]
    pub use codemode_gen::{META_TOOL_NAME, partition::partition};
    #[cfg(feature = "mcp")]
    pub use codemode_mcp::{McpClient, McpToolBridge, discover_catalog};
}
