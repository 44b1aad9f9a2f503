#![deny(missing_docs)]
//! Subagent loop and event middleware for codemode.
//!
//! [`ToolLoop`] runs the Reason-Act-Observe cycle over a
//! [`Provider`](codemode_turn::Provider) and a
//! [`ToolRegistry`](codemode_tool::ToolRegistry); wrap the provider in
//! an [`EmittingProvider`] and the parent process observes every
//! thinking block, tool call, and tool result as it happens.

pub mod middleware;
pub mod tool_loop;

pub use middleware::{EmitterConfig, EmittingProvider};
pub use tool_loop::{
    ExitReason, LoopConfig, LoopError, LoopOutcome, SubagentIdentity, ToolLoop,
};
