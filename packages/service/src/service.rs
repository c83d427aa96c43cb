//! Service entry point: routes received tasks by type and answers service
//! discovery.
//!
//! The transport that delivers tasks is not part of this crate; a host embeds
//! [`Service`] and feeds it one decoded [`Task`] per call to
//! [`Service::handle`], returning the completed result to the runner.

use std::sync::Arc;
use std::time::Duration;

use datalink_core::{Task, TaskResponse, TaskResult, TaskType};
use serde_json::json;
use tracing::info;

use crate::config::ServiceConfig;
use crate::data::{DataLink, ProtocolError, ServiceObject, ServiceObjectRegistry};
use crate::modules::ModuleContext;

/// Failures from task routing.
///
/// `Protocol` wraps the dispatcher's validation failures; `InvalidTaskType`
/// means the runner sent a task this service cannot host at all.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid task type")]
    InvalidTaskType,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// An embeddable Datalink service instance.
///
/// Owns the handler registry, the dispatch engine, and the shared HTTP client
/// used by the backend modules. Registration is expected at startup, before
/// task traffic begins.
pub struct Service {
    config: ServiceConfig,
    http: reqwest::Client,
    data: DataLink,
}

impl Service {
    /// Creates a service with an empty registry.
    ///
    /// # Errors
    ///
    /// Returns an error when the shared HTTP client cannot be built.
    pub fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        let data = DataLink::new(Arc::new(ServiceObjectRegistry::new()));
        info!("datalink service initialized");
        Ok(Self { config, http, data })
    }

    /// The dispatch engine, e.g. for direct `process` calls in tests.
    #[must_use]
    pub fn data(&self) -> &DataLink {
        &self.data
    }

    /// Registration handle for the named service object.
    #[must_use]
    pub fn service_object(&self, name: &str) -> ServiceObject {
        self.data.registry().service_object(name)
    }

    /// Routes one received task.
    ///
    /// Data tasks run the dispatch engine with a freshly generated module
    /// context; discovery tasks answer with the registered service-object
    /// names.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidTaskType`] for unroutable tasks and
    /// [`ServiceError::Protocol`] for the dispatcher's validation failures.
    pub async fn handle(&self, task: &Task) -> Result<TaskResult, ServiceError> {
        match task.task_type {
            TaskType::DataLink => {
                let modules = ModuleContext::generate(task, self.http.clone(), &self.config);
                Ok(self.data.process(task, &modules).await?)
            }
            TaskType::ServiceDiscovery => Ok(self.discovery_result()),
            TaskType::Unknown => Err(ServiceError::InvalidTaskType),
        }
    }

    /// Discovery payload: the set of registered service-object names, in the
    /// wrapper shape the service bootstrap consumes.
    fn discovery_result(&self) -> TaskResult {
        let payload = json!({
            "dataLink": {
                "serviceObjects": self.data.registry().service_objects(),
            }
        });
        TaskResult::from(TaskResponse::new(200, payload.to_string(), false))
    }
}

/// Installs the process-wide tracing subscriber, honoring `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use datalink_core::{Method, TaskRequest};
    use serde_json::Value;

    use super::*;

    fn data_task() -> Task {
        Task {
            task_type: TaskType::DataLink,
            method: Some(Method::Post),
            request: TaskRequest {
                service_object_name: Some("books".to_string()),
                ..TaskRequest::default()
            },
            ..Task::default()
        }
    }

    #[tokio::test]
    async fn routes_data_tasks_to_the_engine() {
        let service = Service::new(ServiceConfig::default()).unwrap();
        service
            .service_object("books")
            .on_insert(|_request, complete| async move { complete.ok().next() });

        let result = service.handle(&data_task()).await.unwrap();
        assert_eq!(result.response.status_code, 200);
        assert_eq!(result.response.body, "{}");
        assert!(result.response.continue_pipeline);
    }

    #[tokio::test]
    async fn discovery_lists_registered_service_objects() {
        let service = Service::new(ServiceConfig::default()).unwrap();
        service.service_object("books");
        service.service_object("authors");

        let task = Task {
            task_type: TaskType::ServiceDiscovery,
            ..Task::default()
        };
        let result = service.handle(&task).await.unwrap();
        assert_eq!(result.response.status_code, 200);

        let payload: Value = serde_json::from_str(&result.response.body).unwrap();
        let mut names: Vec<&str> = payload["dataLink"]["serviceObjects"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        names.sort_unstable();
        assert_eq!(names, vec!["authors", "books"]);
    }

    #[tokio::test]
    async fn unknown_task_types_are_rejected() {
        let service = Service::new(ServiceConfig::default()).unwrap();
        let task = Task::default();
        let err = service.handle(&task).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTaskType));
    }

    #[tokio::test]
    async fn protocol_failures_propagate_through_routing() {
        let service = Service::new(ServiceConfig::default()).unwrap();
        service
            .service_object("books")
            .on_insert(|_request, complete| async move { complete.ok().next() });

        let mut task = data_task();
        task.method = None;
        let err = service.handle(&task).await.unwrap_err();
        let ServiceError::Protocol(protocol) = err else {
            panic!("expected a protocol error");
        };
        assert_eq!(
            protocol.response.body.debug,
            Some(Value::String("Cannot determine data operation".to_string()))
        );
    }
}
