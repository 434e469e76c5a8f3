//! # Request Queue
//!
//! FIFO of pending remote requests, each paired with an optional
//! continuation to run on the response.
//!
//! The queue is an explicit state machine:
//!
//! ```text
//!            push                      next() == None
//!   Idle ──────────────▶ Draining ───────────────────▶ Idle
//!     │                     ▲
//!     │ hold()              │ release() with work pending
//!     ▼                     │
//!   Held ───────────────────┘   (release() with nothing pending → Idle)
//! ```
//!
//! The queue itself never talks to the service. `GraphSession` owns the
//! dispatch loop and asks the queue whether it should start draining.

use crate::PsynthError;
use crate::operation::Request;
use crate::session::GraphSession;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;

type OnSuccess = Box<dyn FnOnce(&mut GraphSession, &Value) + Send>;
type OnFailure = Box<dyn FnOnce(&mut GraphSession, PsynthError) + Send>;

/// Handlers run when a queued request settles.
///
/// Both receive the session, so they may mutate entities or enqueue further
/// requests; those join the tail of the queue. A failure with no failure
/// handler goes to the session's failure log.
pub struct Continuation {
    on_success: OnSuccess,
    on_failure: Option<OnFailure>,
}

impl Continuation {
    /// Run `f` with a successful response's body.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&mut GraphSession, &Value) + Send + 'static,
    {
        Self {
            on_success: Box::new(f),
            on_failure: None,
        }
    }

    /// Handle this request's failure with `f` instead of logging it on the
    /// session.
    #[must_use]
    pub fn or_else<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut GraphSession, PsynthError) + Send + 'static,
    {
        self.on_failure = Some(Box::new(f));
        self
    }

    /// Run `first`, then `inner`'s success handler. A failure goes to
    /// `inner`'s failure handler, if it has one.
    pub(crate) fn preceded_by<F>(first: F, inner: Option<Continuation>) -> Self
    where
        F: FnOnce(&mut GraphSession, &Value) + Send + 'static,
    {
        let (next, on_failure) = match inner {
            Some(inner) => (Some(inner.on_success), inner.on_failure),
            None => (None, None),
        };
        Self {
            on_success: Box::new(move |session: &mut GraphSession, body: &Value| {
                first(session, body);
                if let Some(next) = next {
                    next(session, body);
                }
            }),
            on_failure,
        }
    }

    pub(crate) fn succeed(self, session: &mut GraphSession, body: &Value) {
        (self.on_success)(session, body);
    }

    /// Hand `error` to the failure handler. Returns it back when there is
    /// none.
    pub(crate) fn fail(self, session: &mut GraphSession, error: PsynthError) -> Option<PsynthError> {
        match self.on_failure {
            Some(on_failure) => {
                on_failure(session, error);
                None
            }
            None => Some(error),
        }
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("on_failure", &self.on_failure.is_some())
            .finish_non_exhaustive()
    }
}

/// Wrap a success handler as a continuation.
pub fn then<F>(f: F) -> Option<Continuation>
where
    F: FnOnce(&mut GraphSession, &Value) + Send + 'static,
{
    Some(Continuation::new(f))
}

/// Dispatch state of a `RequestQueue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueState {
    /// Nothing in flight; the next push starts draining.
    #[default]
    Idle,
    /// Pushes accumulate until released.
    Held,
    /// One request is in flight or about to be sent.
    Draining,
}

/// A queued request and its continuation.
pub struct Pending {
    pub request: Request,
    pub continuation: Option<Continuation>,
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("request", &self.request)
            .field("continuation", &self.continuation.is_some())
            .finish()
    }
}

/// Ordered pending requests plus the dispatch state.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: VecDeque<Pending>,
    state: QueueState,
}

impl RequestQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> QueueState {
        self.state
    }

    /// Number of requests waiting to be sent.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Operations waiting to be sent, head first.
    pub fn operations(&self) -> impl Iterator<Item = &Request> + '_ {
        self.pending.iter().map(|p| &p.request)
    }

    /// Append to the tail.
    ///
    /// Returns `true` when the caller must start draining: the queue was
    /// idle and is now draining.
    pub fn push(&mut self, request: Request, continuation: Option<Continuation>) -> bool {
        self.pending.push_back(Pending {
            request,
            continuation,
        });
        if self.state == QueueState::Idle {
            self.state = QueueState::Draining;
            true
        } else {
            false
        }
    }

    /// Pop the head for dispatch. Returns to `Idle` once empty.
    pub fn next(&mut self) -> Option<Pending> {
        let head = self.pending.pop_front();
        if head.is_none() {
            self.state = QueueState::Idle;
        }
        head
    }

    /// Stop an idle queue from draining on push.
    ///
    /// Returns `true` if this call took the hold; a queue that is already
    /// held or draining is left alone.
    pub fn hold(&mut self) -> bool {
        if self.state == QueueState::Idle {
            self.state = QueueState::Held;
            true
        } else {
            false
        }
    }

    /// Release a hold. Returns `true` when the caller must start draining.
    pub fn release(&mut self) -> bool {
        if self.state != QueueState::Held {
            return false;
        }
        if self.pending.is_empty() {
            self.state = QueueState::Idle;
            false
        } else {
            self.state = QueueState::Draining;
            true
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
