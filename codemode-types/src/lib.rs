#![deny(missing_docs)]
//! Shared data model for the codemode system.
//!
//! These types cross every internal boundary: the content blocks a
//! sandboxed program can return, the tool and server descriptors that
//! drive code generation, and the execution request/result/error model
//! of the sandbox engine.

pub mod catalog;
pub mod content;
pub mod exec;

pub use catalog::{CodeModeServer, ServerTransport, ToolCatalog, ToolDescriptor};
pub use content::ContentBlock;
pub use exec::{ExecError, ExecutionOutput, ExecutionRequest};
