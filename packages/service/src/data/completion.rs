//! Fluent completion protocol: the builder a handler uses to set status and
//! payload, then finalize with a continuation decision.
//!
//! The builder is an explicit finite-state machine:
//!
//! 1. **Open** -- created by the dispatcher, payload may be set via `respond`
//! 2. **StatusSet** -- any status method was called (idempotent, last wins)
//! 3. **Finalized** -- `next()` or `done()` was called (terminal)
//!
//! One builder exists per dispatch cycle; it is consumed exactly once when
//! the dispatcher assembles the wire response.

use datalink_core::{CompletionStatus, ErrorBody, TaskResponse};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderState {
    Open,
    StatusSet,
    Finalized,
}

/// Response builder handed to each invoked handler as its second argument.
///
/// Typical chains:
///
/// ```
/// # use datalink_service::data::Completion;
/// # use serde_json::json;
/// let outcome = Completion::new().respond(json!({ "foo": "bar" })).ok().next();
/// let failure = Completion::new().respond("no such entity").not_found().done();
/// ```
///
/// The dispatcher creates one fresh builder per cycle; constructing one
/// directly is useful when unit-testing handlers.
#[derive(Debug)]
pub struct Completion {
    payload: Option<Value>,
    status: Option<CompletionStatus>,
    continue_pipeline: bool,
    state: BuilderState,
}

impl Completion {
    /// Creates an open builder with no payload and no status.
    #[must_use]
    pub fn new() -> Self {
        Self {
            payload: None,
            status: None,
            continue_pipeline: false,
            state: BuilderState::Open,
        }
    }

    /// Sets the response payload.
    ///
    /// For success statuses the payload becomes the response body verbatim;
    /// for error statuses it is carried in the body's `debug` field.
    #[must_use]
    pub fn respond(mut self, payload: impl Into<Value>) -> Self {
        if self.state == BuilderState::Finalized {
            warn!("completion already finalized; ignoring respond()");
            return self;
        }
        self.payload = Some(payload.into());
        self
    }

    /// 200 OK.
    #[must_use]
    pub fn ok(self) -> Self {
        self.set_status(CompletionStatus::Ok)
    }

    /// 201 Created.
    #[must_use]
    pub fn created(self) -> Self {
        self.set_status(CompletionStatus::Created)
    }

    /// 202 Accepted.
    #[must_use]
    pub fn accepted(self) -> Self {
        self.set_status(CompletionStatus::Accepted)
    }

    /// 400 with error kind `BadRequest`.
    #[must_use]
    pub fn bad_request(self) -> Self {
        self.set_status(CompletionStatus::BadRequest)
    }

    /// 401 with error kind `InvalidCredentials`.
    #[must_use]
    pub fn unauthorized(self) -> Self {
        self.set_status(CompletionStatus::Unauthorized)
    }

    /// 403 with error kind `Forbidden`.
    #[must_use]
    pub fn forbidden(self) -> Self {
        self.set_status(CompletionStatus::Forbidden)
    }

    /// 404 with error kind `NotFound`.
    #[must_use]
    pub fn not_found(self) -> Self {
        self.set_status(CompletionStatus::NotFound)
    }

    /// 405 with error kind `NotAllowed`.
    #[must_use]
    pub fn not_allowed(self) -> Self {
        self.set_status(CompletionStatus::NotAllowed)
    }

    /// 501 with error kind `NotImplemented`.
    #[must_use]
    pub fn not_implemented(self) -> Self {
        self.set_status(CompletionStatus::NotImplemented)
    }

    /// 550 with error kind `DataLinkRuntimeError`.
    #[must_use]
    pub fn runtime_error(self) -> Self {
        self.set_status(CompletionStatus::RuntimeError)
    }

    /// Finalizes the response and signals that the pipeline should continue
    /// to any downstream stage.
    #[must_use]
    pub fn next(self) -> Self {
        self.finalize(true)
    }

    /// Finalizes the response and terminates the pipeline.
    #[must_use]
    pub fn done(self) -> Self {
        self.finalize(false)
    }

    /// Current status classification, if any was set.
    #[must_use]
    pub fn status(&self) -> Option<CompletionStatus> {
        self.status
    }

    /// Payload supplied via `respond`, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// True once `next()` or `done()` was called.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.state == BuilderState::Finalized
    }

    /// True when the builder was finalized with `next()`.
    #[must_use]
    pub fn continues(&self) -> bool {
        self.state == BuilderState::Finalized && self.continue_pipeline
    }

    fn set_status(mut self, status: CompletionStatus) -> Self {
        if self.state == BuilderState::Finalized {
            warn!(?status, "completion already finalized; ignoring status");
            return self;
        }
        self.status = Some(status);
        self.state = BuilderState::StatusSet;
        self
    }

    fn finalize(mut self, continue_pipeline: bool) -> Self {
        if self.state == BuilderState::Finalized {
            warn!("completion finalized twice; keeping the first decision");
            return self;
        }
        self.continue_pipeline = continue_pipeline;
        self.state = BuilderState::Finalized;
        self
    }

    /// Consumes the builder into the wire response.
    ///
    /// An unfinalized builder with a status is treated exactly as `done()`.
    /// Returns `None` when no status was ever set; the dispatcher then
    /// synthesizes a runtime-error result.
    pub(crate) fn into_response(self) -> Option<TaskResponse> {
        let status = self.status?;
        if self.state != BuilderState::Finalized {
            warn!("handler returned an unfinalized completion; treating as done()");
        }
        let continue_pipeline =
            self.state == BuilderState::Finalized && self.continue_pipeline;
        let body = serialize_body(status, self.payload);
        Some(TaskResponse::new(status.status_code(), body, continue_pipeline))
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes the response body per the completion protocol: error statuses
/// wrap the payload in an `ErrorBody`; success statuses emit the payload
/// verbatim, with `"{}"` standing in for an absent one.
fn serialize_body(status: CompletionStatus, payload: Option<Value>) -> String {
    let serialized = if status.is_error() {
        ErrorBody::for_status(status, payload).map(|body| serde_json::to_string(&body))
    } else {
        payload.map(|value| serde_json::to_string(&value))
    };
    match serialized {
        Some(Ok(body)) => body,
        // Value-to-string serialization has no failure mode for JSON values,
        // but the contract requires a string body either way.
        Some(Err(_)) | None => String::from("{}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
