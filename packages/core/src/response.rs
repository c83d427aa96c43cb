//! Wire-shaped dispatch output returned to the task runner.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Completed response for one dispatch cycle.
///
/// `body` is always a JSON string, even for empty payloads (`"{}"`), so the
/// transport never has to distinguish "no content" from "no body field".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub body: String,
    /// Whether a downstream pipeline stage should run after this response.
    /// Opaque to the engine: set by the handler, forwarded verbatim.
    #[serde(rename = "continue")]
    pub continue_pipeline: bool,
}

impl TaskResponse {
    /// Builds a terminal response with empty headers.
    #[must_use]
    pub fn new(status_code: u16, body: String, continue_pipeline: bool) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
            body,
            continue_pipeline,
        }
    }
}

/// Successful outcome of `process`: the response, wrapped the way the task
/// runner expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub response: TaskResponse,
}

impl From<TaskResponse> for TaskResult {
    fn from(response: TaskResponse) -> Self {
        Self { response }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
