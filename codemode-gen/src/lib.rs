#![deny(missing_docs)]
//! Code generation for codemode sandboxes.
//!
//! Turns a partitioned tool catalog into a complete, deterministic Rust
//! driver source plus the sandbox package manifest: JSON Schemas become
//! named record types, every remote tool becomes a typed wrapper
//! function, and the driver's `main` wires MCP sessions with
//! signal-aware cancellation.

pub mod describe;
pub mod driver;
pub mod manifest;
pub mod naming;
pub mod partition;
pub mod schema;

use thiserror::Error;

/// The reserved name of the meta-tool the model calls to submit code.
///
/// No catalog tool may use this name, and no two catalog tools may
/// collide with each other after identifier normalization.
pub const META_TOOL_NAME: &str = "execute_rust_code";

/// Errors raised while validating a catalog or generating source.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GenError {
    /// A tool schema could not be lowered to type declarations.
    #[error("schema for {context}: {message}")]
    Schema {
        /// What was being lowered (e.g. `tool read_file input`).
        context: String,
        /// Why lowering failed.
        message: String,
    },

    /// Two distinct tool names normalize to the same identifier.
    #[error(
        "tool name collision: \"{first}\" and \"{second}\" both normalize to `{identifier}`"
    )]
    NameCollision {
        /// First offending source name.
        first: String,
        /// Second offending source name.
        second: String,
        /// The shared normalized identifier.
        identifier: String,
    },

    /// A catalog tool uses the reserved meta-tool name.
    #[error(
        "tool \"{0}\" conflicts with the reserved meta-tool name; exclude it or remove it from the server"
    )]
    ReservedName(String),

    /// The catalog names a server that has no transport descriptor.
    #[error("no server descriptor for \"{0}\"")]
    MissingServer(String),
}
