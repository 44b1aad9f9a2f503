//! Loopback HTTP server receiving subagent events.
//!
//! Binds `127.0.0.1` on an OS-chosen port and accepts
//! `POST /subagent-events` with one JSON event per request. Decoding is
//! strict: malformed JSON is 400, non-POST methods are 405. Requests
//! are served concurrently; the supplied handler must be safe under
//! concurrent invocation (see [`EventWriter`](crate::writer::EventWriter)).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::event::Event;

/// Path events are POSTed to.
pub const EVENTS_PATH: &str = "/subagent-events";

/// How long in-flight requests get after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Callback invoked once per accepted event, possibly from many tasks
/// at once.
pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

/// Errors starting the event server.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventServerError {
    /// The loopback listener could not be bound.
    #[error("binding event server: {0}")]
    Bind(std::io::Error),
}

/// A running event server.
pub struct EventServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl EventServer {
    /// Bind the loopback listener and start serving.
    ///
    /// The server shuts down when `shutdown` is cancelled, waiting at
    /// most [`SHUTDOWN_GRACE`] for in-flight requests.
    ///
    /// # Errors
    ///
    /// [`EventServerError::Bind`] when the listener cannot be bound.
    pub async fn start(
        handler: EventHandler,
        shutdown: CancellationToken,
    ) -> Result<Self, EventServerError> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(EventServerError::Bind)?;
        let addr = listener.local_addr().map_err(EventServerError::Bind)?;

        let app = Router::new()
            .route(EVENTS_PATH, post(accept_event))
            .with_state(handler);

        let graceful = shutdown.clone();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                graceful.cancelled().await;
            });
            tokio::select! {
                result = serve => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "event server terminated");
                    }
                }
                _ = async {
                    shutdown.cancelled().await;
                    tokio::time::sleep(SHUTDOWN_GRACE).await;
                } => {
                    tracing::warn!("event server shutdown grace elapsed; dropping in-flight requests");
                }
            }
        });

        tracing::debug!(%addr, "event server listening");
        Ok(Self { addr, task })
    }

    /// The server's base URL, e.g. `http://127.0.0.1:49152`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The bound socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The environment variable assignment a child subagent needs to
    /// reach this server: `(CODEMODE_SUBAGENT_LOGGING_ADDRESS, url)`.
    pub fn child_env(&self) -> (&'static str, String) {
        (crate::client::SUBAGENT_ADDRESS_ENV, self.url())
    }

    /// Wait for the server task to finish (after its token is cancelled).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

async fn accept_event(State(handler): State<EventHandler>, body: Bytes) -> StatusCode {
    match serde_json::from_slice::<Event>(&body) {
        Ok(event) => {
            handler(event);
            StatusCode::OK
        }
        Err(e) => {
            tracing::warn!(error = %e, "rejecting malformed event");
            StatusCode::BAD_REQUEST
        }
    }
}
