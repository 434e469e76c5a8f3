//! In-memory `RemoteGraphService` for tests.
//!
//! Built for this crate's unit tests and behind the `testing` feature.
//!
//! `ScriptedService` records every call and answers from a per-operation
//! script, falling back to `200 {}`.

use crate::operation::{Operation, Params};
use crate::remote::{RemoteGraphService, Response, TransportError};
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub operation: Operation,
    pub params: Params,
}

impl Call {
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Shared view of a service's calls; stays readable after the service has
/// moved into a session.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().iter().map(|c| c.operation).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Highest number of calls observed executing at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// A service that answers from a script.
#[derive(Debug, Default)]
pub struct ScriptedService {
    log: CallLog,
    script: BTreeMap<Operation, VecDeque<Result<Response, TransportError>>>,
}

impl ScriptedService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to this service's call log.
    #[must_use]
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Queue a response for the next call of `operation`.
    #[must_use]
    pub fn respond(mut self, operation: Operation, response: Response) -> Self {
        self.script.entry(operation).or_default().push_back(Ok(response));
        self
    }

    /// Queue a transport failure for the next call of `operation`.
    #[must_use]
    pub fn fail(mut self, operation: Operation, error: TransportError) -> Self {
        self.script.entry(operation).or_default().push_back(Err(error));
        self
    }
}

impl RemoteGraphService for ScriptedService {
    fn execute(
        &mut self,
        operation: Operation,
        params: &Params,
    ) -> Result<Response, TransportError> {
        let now = self.log.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.log.lock().push(Call {
            operation,
            params: params.clone(),
        });
        let outcome = self
            .script
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Response::ok(json!({}))));

        self.log.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
