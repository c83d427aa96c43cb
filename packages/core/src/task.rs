//! Inbound task envelope delivered by the task receiver transport.
//!
//! A `Task` is read-only input to a dispatch cycle. Several fields can appear
//! both at the task root and inside the nested `request` object; see
//! [`Task::resolved_query`] for the resolution rule.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved `endpoint` value marking the count variant of a read.
pub const COUNT_ENDPOINT: &str = "_count";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Task discriminator set by the task runner.
///
/// Unrecognized values deserialize to `Unknown` so a newer runner cannot make
/// the envelope unparseable; the service rejects them at routing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "dataLink")]
    DataLink,
    #[serde(rename = "serviceDiscovery")]
    ServiceDiscovery,
    #[default]
    #[serde(other)]
    Unknown,
}

/// HTTP-style verb carried by a task. Wire format is uppercase.
///
/// Verbs outside the fixed set deserialize to `Other`, which classifies as
/// indeterminate rather than failing envelope parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    #[serde(other)]
    Other,
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// Environment metadata attached to every task by the hosting backend.
///
/// Feeds the backend store modules: `id` is the environment identifier used
/// in backend routes, the secret pair selects Basic credentials, and
/// `baas_url` is the backend base URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppMetadata {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub appsecret: Option<String>,
    pub mastersecret: Option<String>,
    pub authenticated_username: Option<String>,
    pub baas_url: Option<String>,
    #[serde(rename = "API_version")]
    pub api_version: Option<i64>,
}

/// Nested per-request view carried inside the task envelope.
///
/// Duplicates several root fields; the nested copy is authoritative when both
/// are present (see [`Task::resolved_query`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskRequest {
    pub method: Option<String>,
    pub headers: HashMap<String, String>,
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub entity_id: Option<String>,
    pub service_object_name: Option<String>,
    pub query: Option<Value>,
    pub body: Option<Value>,
}

/// One inbound task, immutable for the duration of its dispatch cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub task_id: Option<Value>,
    pub request_id: Option<String>,
    pub task_type: TaskType,
    pub method: Option<Method>,
    pub endpoint: Option<String>,
    pub entity_id: Option<String>,
    pub query: Option<Value>,
    pub body: Option<Value>,
    pub service_object_name: Option<String>,
    pub app_metadata: AppMetadata,
    pub auth_key: Option<String>,
    pub request: TaskRequest,
}

impl Task {
    /// Resolves the query filter by ordered lookup: the nested `request.query`
    /// wins over the task root `query`; the first present value is used.
    ///
    /// Both locations are honored for compatibility with older task runners
    /// that only populate one of them. JSON `null` counts as absent.
    #[must_use]
    pub fn resolved_query(&self) -> Option<&Value> {
        self.request
            .query
            .as_ref()
            .filter(|v| !v.is_null())
            .or(self.query.as_ref().filter(|v| !v.is_null()))
    }

    /// Resolves the entity identifier with the same ordered lookup as
    /// [`Self::resolved_query`]. Empty strings count as absent: an operation
    /// addressed "by id" needs an actual identifier.
    #[must_use]
    pub fn resolved_entity_id(&self) -> Option<&str> {
        self.request
            .entity_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or(self.entity_id.as_deref().filter(|id| !id.is_empty()))
    }

    /// Resolves the raw request body, nested location first.
    #[must_use]
    pub fn resolved_body(&self) -> Option<&Value> {
        self.request
            .body
            .as_ref()
            .filter(|v| !v.is_null())
            .or(self.body.as_ref().filter(|v| !v.is_null()))
    }

    /// Resolves the target service-object name, nested location first.
    #[must_use]
    pub fn resolved_service_object_name(&self) -> Option<&str> {
        self.request
            .service_object_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self
                .service_object_name
                .as_deref()
                .filter(|name| !name.is_empty()))
    }

    /// True when the task's `endpoint` is the reserved count marker.
    #[must_use]
    pub fn is_count_endpoint(&self) -> bool {
        self.endpoint.as_deref() == Some(COUNT_ENDPOINT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
