#![deny(missing_docs)]
//! MCP client plumbing for the codemode parent process.
//!
//! [`McpClient`] connects to an MCP server over any configured
//! transport and lists its tools into [`ToolDescriptor`]s (including
//! output schemas, which drive code generation). [`McpToolBridge`]
//! adapts a discovered tool to the [`ToolDyn`](codemode_tool::ToolDyn)
//! trait so excluded tools can be exposed to the model directly,
//! alongside the meta-tool.
//!
//! [`ToolDescriptor`]: codemode_types::ToolDescriptor

pub mod bridge;
pub mod client;
pub mod error;

pub use bridge::McpToolBridge;
pub use client::{McpClient, discover_catalog};
pub use error::McpError;
