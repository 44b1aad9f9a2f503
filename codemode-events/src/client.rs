//! Synchronous event emission.
//!
//! Every emission is one POST with a bounded timeout. There is no
//! queue, no retry, and no buffering: the caller must treat any failure
//! as fatal to the subagent, because the parent is entitled to observe
//! every event before the subagent proceeds.

use std::time::Duration;

use thiserror::Error;

use crate::event::{Event, EventKind};
use crate::server::EVENTS_PATH;

/// Environment variable carrying the parent's event server base URL to
/// child subagents.
pub const SUBAGENT_ADDRESS_ENV: &str = "CODEMODE_SUBAGENT_LOGGING_ADDRESS";

/// Per-request emission timeout.
pub const EMIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from event emission. Every variant names the event kind.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EmitError {
    /// The HTTP client could not be constructed.
    #[error("building event client: {0}")]
    Client(String),

    /// The request never produced a response (connection refused,
    /// timeout, DNS, ...).
    #[error("emitting {kind} event: {message}")]
    Transport {
        /// The event kind being emitted.
        kind: EventKind,
        /// Transport-level failure description.
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("emitting {kind} event: server returned status {status}")]
    Status {
        /// The event kind being emitted.
        kind: EventKind,
        /// The HTTP status code.
        status: u16,
    },
}

/// Client for the parent's `/subagent-events` endpoint.
#[derive(Debug, Clone)]
pub struct EventClient {
    endpoint: String,
    http: reqwest::Client,
}

impl EventClient {
    /// Build a client for `base_url` (e.g. `http://127.0.0.1:49152`).
    ///
    /// # Errors
    ///
    /// [`EmitError::Client`] when the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, EmitError> {
        let http = reqwest::Client::builder()
            .timeout(EMIT_TIMEOUT)
            .build()
            .map_err(|e| EmitError::Client(e.to_string()))?;
        Ok(Self {
            endpoint: format!("{}{EVENTS_PATH}", base_url.trim_end_matches('/')),
            http,
        })
    }

    /// Build a client from [`SUBAGENT_ADDRESS_ENV`], or `None` when the
    /// variable is unset (event emission disabled for this process).
    ///
    /// # Errors
    ///
    /// [`EmitError::Client`] when the variable is set but the client
    /// cannot be built.
    pub fn from_env() -> Result<Option<Self>, EmitError> {
        match std::env::var(SUBAGENT_ADDRESS_ENV) {
            Ok(addr) if !addr.is_empty() => Ok(Some(Self::new(&addr)?)),
            _ => Ok(None),
        }
    }

    /// The endpoint this client POSTs to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Emit one event, synchronously.
    ///
    /// # Errors
    ///
    /// [`EmitError::Transport`] or [`EmitError::Status`]; either must
    /// abort the emitting subagent.
    pub async fn emit(&self, event: &Event) -> Result<(), EmitError> {
        let kind = event.kind;
        let response = self
            .http
            .post(&self.endpoint)
            .json(event)
            .send()
            .await
            .map_err(|e| EmitError::Transport {
                kind,
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(EmitError::Status {
                kind,
                status: status.as_u16(),
            });
        }
        tracing::trace!(%kind, "event emitted");
        Ok(())
    }
}
