//! JSONL sink for received events.
//!
//! Handlers run concurrently, so the underlying writer is behind a
//! mutex and each event is one `write` call: serialize the record plus
//! its trailing newline into a buffer first, then write it atomically
//! with respect to other events.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::event::Event;
use crate::server::EventHandler;

/// Serializes events as JSON lines into a shared writer.
pub struct EventWriter<W: Write + Send + 'static> {
    sink: Mutex<W>,
}

impl<W: Write + Send + 'static> EventWriter<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Arc<Self> {
        Arc::new(Self {
            sink: Mutex::new(writer),
        })
    }

    /// An [`EventHandler`] that appends each event to this writer.
    pub fn handler(self: &Arc<Self>) -> EventHandler {
        let this = Arc::clone(self);
        Arc::new(move |event| this.write_event(&event))
    }

    /// Write one event. Failures are logged, not propagated — the
    /// event server must keep serving.
    pub fn write_event(&self, event: &Event) {
        let mut line = match serde_json::to_vec(event) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize event");
                return;
            }
        };
        line.push(b'\n');
        match self.sink.lock() {
            Ok(mut sink) => {
                if let Err(e) = sink.write_all(&line) {
                    tracing::error!(error = %e, "failed to write event");
                }
            }
            Err(_) => tracing::error!("event sink mutex poisoned"),
        }
    }
}
