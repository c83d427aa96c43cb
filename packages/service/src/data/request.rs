//! Cycle-local request view handed to handlers.

use std::collections::HashMap;

use datalink_core::{Method, Task};
use serde_json::Value;

use crate::modules::ModuleContext;

/// Derived, handler-visible view of one inbound task.
///
/// Owned exclusively by a single dispatch cycle and discarded after
/// completion; handlers never see the raw [`Task`]. The `entity_id`, `query`,
/// and `body` fields hold the resolved values (nested request location wins
/// over the task root), with `body` already parsed from its raw form.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Option<Method>,
    pub service_object_name: String,
    pub entity_id: Option<String>,
    pub query: Option<Value>,
    pub body: Option<Value>,
    pub headers: HashMap<String, String>,
    pub username: Option<String>,
    pub user_id: Option<String>,
    /// Backend modules generated for this cycle (stores, identity).
    pub modules: ModuleContext,
}

impl Request {
    pub(crate) fn from_task(task: &Task, body: Option<Value>, modules: ModuleContext) -> Self {
        Self {
            method: task.method,
            service_object_name: task
                .resolved_service_object_name()
                .unwrap_or_default()
                .to_string(),
            entity_id: task.resolved_entity_id().map(str::to_string),
            query: task.resolved_query().cloned(),
            body,
            headers: task.request.headers.clone(),
            username: task.request.username.clone(),
            user_id: task.request.user_id.clone(),
            modules,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(service_object_name: &str) -> Self {
        Self {
            method: None,
            service_object_name: service_object_name.to_string(),
            entity_id: None,
            query: None,
            body: None,
            headers: HashMap::new(),
            username: None,
            user_id: None,
            modules: ModuleContext::for_tests(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
