#![deny(missing_docs)]
//! Provider seam for the codemode agent loop.
//!
//! [`Provider`] is the inner generator: one completion round-trip against
//! an LLM backend. The tool loop in `codemode-agent` drives it, and the
//! event-emitting middleware wraps it. The types here are the internal
//! lingua franca — not provider wire types.

pub mod provider;
pub mod types;

pub use provider::{Provider, ProviderError};
pub use types::{
    ContentPart, ProviderMessage, ProviderRequest, ProviderResponse, Role, StopReason, TokenUsage,
    ToolSchema,
};
