//! # Remote Service Boundary
//!
//! The single capability the core needs from the outside world: execute
//! one named operation and hand back a status and a body.
//!
//! Transport concerns (HTTP verb, URL layout, encoding, TLS, timeouts) live
//! behind this trait. A call that never returns stalls the request queue,
//! so implementors should bound every call with a timeout.

use crate::PsynthError;
use crate::operation::{Operation, Params};
use crate::primitives::{STATUS_OK, STATUS_REJECTED};
use serde_json::Value;
use thiserror::Error;

/// Raw answer from the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    /// A success response with the given body.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self {
            status: STATUS_OK,
            body,
        }
    }

    /// A validation-failure response carrying a message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_REJECTED,
            body: Value::String(message.into()),
        }
    }
}

/// Failures that prevent a response from being obtained at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The service could not be reached, or the call timed out.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response body could not be read.
    #[error("unreadable body: {0}")]
    Body(String),
}

/// The remote graph-visualization service.
///
/// Implementations are called from one thread at a time and must return
/// before the next request is sent.
pub trait RemoteGraphService: Send {
    /// Execute `operation` with fully tagged `params`.
    fn execute(&mut self, operation: Operation, params: &Params)
    -> Result<Response, TransportError>;
}

impl<T: RemoteGraphService + ?Sized> RemoteGraphService for Box<T> {
    fn execute(
        &mut self,
        operation: Operation,
        params: &Params,
    ) -> Result<Response, TransportError> {
        (**self).execute(operation, params)
    }
}

/// Classify the outcome of one call.
///
/// Status 200 yields the body; 406 is a request-level rejection; any other
/// status or a transport error is a failure of its own kind.
pub fn settle(
    operation: Operation,
    outcome: Result<Response, TransportError>,
) -> Result<Value, PsynthError> {
    let response = outcome.map_err(|e| PsynthError::Transport {
        operation: operation.to_string(),
        message: e.to_string(),
    })?;
    match response.status {
        STATUS_OK => Ok(response.body),
        STATUS_REJECTED => Err(PsynthError::Rejected {
            operation: operation.to_string(),
            message: match response.body {
                Value::String(message) => message,
                other => other.to_string(),
            },
        }),
        status => Err(PsynthError::UnexpectedStatus {
            operation: operation.to_string(),
            status,
        }),
    }
}

// =============================================================================
// TESTS
// =============================================================================
