//! # Session Actor
//!
//! Runs one `GraphSession` on a dedicated worker thread so async callers can
//! share it.
//!
//! ```text
//!  caller ──with(f)──▶ mpsc ──▶ worker thread ──▶ GraphSession ──▶ service
//!    ▲                                │
//!    └──────────── oneshot ◀──────────┘
//! ```
//!
//! The worker applies every command that is already waiting inside one
//! queue hold, so requests from concurrent callers keep their submission
//! order and are sent only after the whole group has been applied.
//!
//! Blocking transports are built and called on the worker thread, never on
//! the async runtime.

use psynth_core::{Continuation, GraphSession, PsynthError};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

type Command = Box<dyn FnOnce(&mut GraphSession) + Send>;

fn worker_gone() -> PsynthError {
    PsynthError::IoError("session worker is no longer running".to_string())
}

/// Async handle to a session owned by a worker thread.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    finished: oneshot::Receiver<GraphSession>,
}

impl SessionHandle {
    /// Start a worker and build its session there with `init`.
    ///
    /// `init` typically calls `create_graph` or `load_graph` with a freshly
    /// built transport.
    pub async fn open<F>(init: F) -> Result<Self, PsynthError>
    where
        F: FnOnce() -> Result<GraphSession, PsynthError> + Send + 'static,
    {
        let (commands, mut inbox) = mpsc::unbounded_channel::<Command>();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (finished_tx, finished) = oneshot::channel();

        std::thread::Builder::new()
            .name("psynth-session".to_string())
            .spawn(move || {
                let mut session = match init() {
                    Ok(session) => {
                        let _ = ready_tx.send(Ok(()));
                        session
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                debug!(graph = session.name(), "session worker started");

                while let Some(first) = inbox.blocking_recv() {
                    session.batch(|s| {
                        first(s);
                        while let Ok(next) = inbox.try_recv() {
                            next(s);
                        }
                    });
                }

                debug!(graph = session.name(), "session worker stopping");
                if finished_tx.send(session).is_err() {
                    warn!("session closed without a receiver");
                }
            })
            .map_err(|e| PsynthError::IoError(format!("cannot start session worker: {e}")))?;

        ready_rx.await.map_err(|_| worker_gone())??;
        Ok(Self { commands, finished })
    }

    /// Run `f` against the session and return its result.
    ///
    /// Requests `f` enqueues are sent after it returns, so the result is
    /// available before their responses. A later command observes the
    /// session after those responses have been handled.
    pub async fn with<R, F>(&self, f: F) -> Result<R, PsynthError>
    where
        F: FnOnce(&mut GraphSession) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Box::new(move |session: &mut GraphSession| {
                let _ = tx.send(f(session));
            }))
            .map_err(|_| worker_gone())?;
        rx.await.map_err(|_| worker_gone())
    }

    /// Issue one request through `f` and wait for its response body.
    ///
    /// `f` receives the continuation to attach to the request it enqueues.
    /// If the service fails that request, its error is returned here and
    /// is not added to the session's failure log.
    pub async fn call<F>(&self, f: F) -> Result<Value, PsynthError>
    where
        F: FnOnce(&mut GraphSession, Option<Continuation>) -> Result<(), PsynthError>
            + Send
            + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Result<Value, PsynthError>>();
        let failed = tx.clone();
        let reply = Continuation::new(move |_, body: &Value| {
            let _ = tx.send(Ok(body.clone()));
        })
        .or_else(move |_, error| {
            let _ = failed.send(Err(error));
        });
        self.with(move |session| f(session, Some(reply))).await??;

        rx.recv().await.unwrap_or_else(|| {
            Err(PsynthError::IoError(
                "request finished without a response".to_string(),
            ))
        })
    }

    /// Stop the worker once pending commands are done and take the session
    /// back.
    pub async fn close(self) -> Result<GraphSession, PsynthError> {
        let Self { commands, finished } = self;
        drop(commands);
        finished.await.map_err(|_| worker_gone())
    }
}

/// Run a blocking closure on its own thread and await the result.
///
/// For one-off calls, like listing graphs, that have no session.
pub async fn run_blocking<R, F>(f: F) -> Result<R, PsynthError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("psynth-call".to_string())
        .spawn(move || {
            let _ = tx.send(f());
        })
        .map_err(|e| PsynthError::IoError(format!("cannot start worker: {e}")))?;
    rx.await.map_err(|_| worker_gone())
}
