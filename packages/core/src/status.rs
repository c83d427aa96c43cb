//! Response status vocabulary shared by the completion builder and the
//! dispatcher fallback paths.
//!
//! Every error classification carries a fixed symbolic kind and a fixed
//! human-readable description; both are part of the wire contract and must
//! not be reworded.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// CompletionStatus
// ---------------------------------------------------------------------------

/// Closed set of response classifications a completion handler can choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionStatus {
    Ok,
    Created,
    Accepted,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    NotAllowed,
    NotImplemented,
    RuntimeError,
}

impl CompletionStatus {
    /// HTTP-semantics status code for this classification.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::Accepted => 202,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::NotAllowed => 405,
            Self::NotImplemented => 501,
            Self::RuntimeError => 550,
        }
    }

    /// Symbolic error tag, `None` for success classifications.
    #[must_use]
    pub const fn error_kind(self) -> Option<&'static str> {
        match self {
            Self::Ok | Self::Created | Self::Accepted => None,
            Self::BadRequest => Some("BadRequest"),
            Self::Unauthorized => Some("InvalidCredentials"),
            Self::Forbidden => Some("Forbidden"),
            Self::NotFound => Some("NotFound"),
            Self::NotAllowed => Some("NotAllowed"),
            Self::NotImplemented => Some("NotImplemented"),
            Self::RuntimeError => Some("DataLinkRuntimeError"),
        }
    }

    /// Fixed description bound to the error kind, `None` for successes.
    #[must_use]
    pub const fn description(self) -> Option<&'static str> {
        match self {
            Self::Ok | Self::Created | Self::Accepted => None,
            Self::BadRequest => Some("Unable to understand request"),
            Self::Unauthorized => {
                Some("Invalid credentials. Please retry your request with correct credentials")
            }
            Self::Forbidden => Some("The request is forbidden"),
            Self::NotFound => {
                Some("The requested entity or entities were not found in the serviceObject")
            }
            Self::NotAllowed => Some("The request is not allowed"),
            Self::NotImplemented => {
                Some("The request invoked a method that is not implemented")
            }
            Self::RuntimeError => {
                Some("The Datalink had a runtime error. See debug message for details")
            }
        }
    }

    /// True for the error family (4xx/5xx), whose bodies are synthesized as
    /// an [`ErrorBody`] wrapping the handler payload in `debug`.
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.error_kind().is_some()
    }
}

// ---------------------------------------------------------------------------
// ErrorBody
// ---------------------------------------------------------------------------

/// Wire body for error-classified responses.
///
/// `debug` carries whatever the handler supplied as its payload and is
/// omitted entirely when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub debug: Option<Value>,
}

impl ErrorBody {
    /// Builds the body for an error classification.
    ///
    /// Success classifications have no kind/description pair to synthesize a
    /// body from, so they return `None`.
    #[must_use]
    pub fn for_status(status: CompletionStatus, debug: Option<Value>) -> Option<Self> {
        let error = status.error_kind()?;
        let description = status.description()?;
        Some(Self {
            error: error.to_string(),
            description: description.to_string(),
            debug,
        })
    }

    /// The debug text when it is a plain string, falling back to the fixed
    /// description. Used for log/Display rendering of validation failures.
    #[must_use]
    pub fn debug_text(&self) -> &str {
        match &self.debug {
            Some(Value::String(text)) => text,
            _ => &self.description,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
