#![deny(missing_docs)]
//! Subagent event bus for codemode.
//!
//! The parent process runs an [`EventServer`] on loopback and hands its
//! address to child subagents via [`SUBAGENT_ADDRESS_ENV`]; each
//! subagent emits [`Event`]s through an [`EventClient`]. Emission is
//! synchronous and unbuffered — a failed emission must abort the
//! subagent.

pub mod client;
pub mod event;
pub mod server;
pub mod writer;

pub use client::{EMIT_TIMEOUT, EmitError, EventClient, SUBAGENT_ADDRESS_ENV};
pub use event::{Event, EventKind, TokenUsageRecord};
pub use server::{EVENTS_PATH, EventHandler, EventServer, EventServerError, SHUTDOWN_GRACE};
pub use writer::EventWriter;
