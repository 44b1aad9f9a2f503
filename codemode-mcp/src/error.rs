//! MCP error type and conversions.
//!
//! We cannot implement `From` for rmcp's error types directly where it
//! would be ambiguous, so the conversions are explicit functions.

use thiserror::Error;

/// Errors from MCP client operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum McpError {
    /// Connecting or handshaking with the server failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A protocol-level request (tool listing, tool call) failed.
    #[error("protocol error: {0}")]
    Protocol(String),
}

pub(crate) fn from_service_error(err: rmcp::ServiceError) -> McpError {
    McpError::Protocol(err.to_string())
}
