//! Dispatch orchestration: validation, classification, registry lookup,
//! handler invocation, and response assembly for one task.

use std::collections::HashMap;
use std::sync::Arc;

use datalink_core::{CompletionStatus, ErrorBody, Task, TaskResponse, TaskResult};
use serde_json::Value;
use tracing::{debug, warn};

use super::classify::{classify, ClassifyError};
use super::completion::Completion;
use super::registry::ServiceObjectRegistry;
use super::request::Request;
use crate::modules::ModuleContext;

/// Debug text of the missing-handler fallback result.
const NOT_IMPLEMENTED_DEBUG: &str = "These methods are not implemented";
/// Debug text of the synthesized result for a handler that never set a status.
const NOT_COMPLETED_DEBUG: &str = "Response was not completed";
/// Debug text of the invalid-body validation failure.
const BODY_NOT_JSON_DEBUG: &str = "Request body is not JSON";

// ---------------------------------------------------------------------------
// ProtocolError
// ---------------------------------------------------------------------------

/// Response attached to a protocol-validation failure.
///
/// Unlike [`TaskResponse`], `body` stays a typed object in the error channel
/// so callers can match on `body.debug`; [`Self::into_task_response`] encodes
/// it to the wire-shaped string form.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: ErrorBody,
    #[serde(rename = "continue")]
    pub continue_pipeline: bool,
}

impl ErrorResponse {
    /// Converts to the wire-shaped response, with the body JSON-encoded.
    #[must_use]
    pub fn into_task_response(self) -> TaskResponse {
        let body = serde_json::to_string(&self.body).unwrap_or_else(|_| String::from("{}"));
        TaskResponse {
            status_code: self.status_code,
            headers: self.headers,
            body,
            continue_pipeline: self.continue_pipeline,
        }
    }
}

/// Protocol-validation failure: the engine could not understand the task at
/// all. Always surfaced through the error channel of `process`, never as a
/// response result — the caller relies on the channel to distinguish "the
/// engine couldn't parse the request" from "the answer is an HTTP error".
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", .response.body.debug_text())]
pub struct ProtocolError {
    pub response: ErrorResponse,
}

impl ProtocolError {
    fn validation(debug: &str) -> Self {
        let status = CompletionStatus::BadRequest;
        let body = ErrorBody {
            error: status.error_kind().unwrap_or_default().to_string(),
            description: status.description().unwrap_or_default().to_string(),
            debug: Some(Value::String(debug.to_string())),
        };
        Self {
            response: ErrorResponse {
                status_code: status.status_code(),
                headers: HashMap::new(),
                body,
                continue_pipeline: false,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// DataLink
// ---------------------------------------------------------------------------

/// The dispatch engine for data tasks.
///
/// One dispatch cycle walks Received → Validated → Classified →
/// {Dispatched | Fallback501} → Completed → Delivered; validation failures
/// short-circuit from Received into the error channel.
pub struct DataLink {
    registry: Arc<ServiceObjectRegistry>,
}

impl DataLink {
    /// Creates a dispatcher over an explicit registry instance.
    #[must_use]
    pub fn new(registry: Arc<ServiceObjectRegistry>) -> Self {
        Self { registry }
    }

    /// The shared registry this dispatcher reads.
    #[must_use]
    pub fn registry(&self) -> &Arc<ServiceObjectRegistry> {
        &self.registry
    }

    /// Processes one task end to end.
    ///
    /// Handler-chosen statuses, including 4xx/5xx and the missing-handler 501
    /// fallback, are delivered as `Ok` results; only the two protocol
    /// validation failures (no verb, non-JSON body) use the error channel.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when the task has no verb ("Cannot determine
    /// data operation") or its body is not valid JSON ("Request body is not
    /// JSON").
    pub async fn process(
        &self,
        task: &Task,
        modules: &ModuleContext,
    ) -> Result<TaskResult, ProtocolError> {
        if task.method.is_none() {
            return Err(ProtocolError::validation(
                &ClassifyError::MissingMethod.to_string(),
            ));
        }

        let body = parse_body(task)?;

        let kind = match classify(task) {
            Ok(kind) => kind,
            Err(ClassifyError::MissingMethod) => {
                return Err(ProtocolError::validation(
                    &ClassifyError::MissingMethod.to_string(),
                ));
            }
            Err(ClassifyError::UnsupportedMethod) => {
                warn!(method = ?task.method, "no data operation for task verb");
                return Ok(not_implemented_result());
            }
        };

        let Some(name) = task.resolved_service_object_name() else {
            warn!("task names no service object");
            return Ok(not_implemented_result());
        };
        let Some(handler) = self.registry.handler(name, kind) else {
            warn!(
                service_object = name,
                operation = kind.handler_name(),
                "no handler registered"
            );
            return Ok(not_implemented_result());
        };

        debug!(
            service_object = name,
            operation = kind.handler_name(),
            "dispatching data task"
        );

        let request = Request::from_task(task, body, modules.clone());
        let completion = handler(request, Completion::new()).await;

        let response = completion.into_response().unwrap_or_else(|| {
            warn!(
                service_object = name,
                operation = kind.handler_name(),
                "handler never classified its response"
            );
            not_completed_response()
        });
        Ok(TaskResult::from(response))
    }
}

/// Parses the resolved raw body. A structured body passes through; a string
/// body must itself parse as JSON.
fn parse_body(task: &Task) -> Result<Option<Value>, ProtocolError> {
    match task.resolved_body() {
        None => Ok(None),
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|_| ProtocolError::validation(BODY_NOT_JSON_DEBUG)),
        Some(value) => Ok(Some(value.clone())),
    }
}

fn error_result(status: CompletionStatus, debug: &str) -> TaskResult {
    let body = ErrorBody::for_status(status, Some(Value::String(debug.to_string())));
    let body = body
        .map(|b| serde_json::to_string(&b).unwrap_or_else(|_| String::from("{}")))
        .unwrap_or_else(|| String::from("{}"));
    TaskResult::from(TaskResponse::new(status.status_code(), body, false))
}

/// Missing-handler fallback: a result, not an error.
fn not_implemented_result() -> TaskResult {
    error_result(CompletionStatus::NotImplemented, NOT_IMPLEMENTED_DEBUG)
}

/// Synthesized response for a handler that returned an entirely open builder.
fn not_completed_response() -> TaskResponse {
    let TaskResult { response } = error_result(CompletionStatus::RuntimeError, NOT_COMPLETED_DEBUG);
    response
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use datalink_core::{Method, TaskRequest};
    use parking_lot::Mutex;
    use serde_json::json;

    use super::super::classify::OperationKind;
    use super::*;

    const SERVICE_OBJECT: &str = "myServiceObject";

    fn sample_task(method: Method) -> Task {
        Task {
            task_id: Some(json!(123_456)),
            method: Some(method),
            request: TaskRequest {
                method: Some(format!("{method:?}").to_uppercase()),
                entity_id: Some("12345".to_string()),
                service_object_name: Some(SERVICE_OBJECT.to_string()),
                username: Some("kid_user".to_string()),
                user_id: Some("kid_user".to_string()),
                ..TaskRequest::default()
            },
            ..Task::default()
        }
    }

    fn engine() -> DataLink {
        DataLink::new(Arc::new(ServiceObjectRegistry::new()))
    }

    fn modules() -> ModuleContext {
        ModuleContext::for_tests()
    }

    #[tokio::test]
    async fn dispatches_an_insert() {
        let data = engine();
        let invoked = Arc::new(AtomicBool::new(false));
        let seen = invoked.clone();
        data.registry()
            .service_object(SERVICE_OBJECT)
            .on_insert(move |request, complete| {
                let seen = seen.clone();
                async move {
                    assert_eq!(request.entity_id.as_deref(), Some("12345"));
                    seen.store(true, Ordering::SeqCst);
                    complete.ok().next()
                }
            });

        let result = data
            .process(&sample_task(Method::Post), &modules())
            .await
            .unwrap();
        assert!(invoked.load(Ordering::SeqCst));
        assert_eq!(result.response.status_code, 200);
    }

    #[tokio::test]
    async fn classifies_each_operation_to_its_handler() {
        struct Case {
            method: Method,
            endpoint: Option<&'static str>,
            entity_id: bool,
            query: bool,
            expected: &'static str,
        }
        let cases = [
            Case { method: Method::Post, endpoint: None, entity_id: true, query: false, expected: "onInsert" },
            Case { method: Method::Put, endpoint: None, entity_id: true, query: false, expected: "onUpdate" },
            Case { method: Method::Get, endpoint: None, entity_id: false, query: false, expected: "onGetAll" },
            Case { method: Method::Get, endpoint: None, entity_id: true, query: false, expected: "onGetById" },
            Case { method: Method::Get, endpoint: None, entity_id: false, query: true, expected: "onGetByQuery" },
            Case { method: Method::Get, endpoint: Some("_count"), entity_id: false, query: false, expected: "onGetCount" },
            Case { method: Method::Get, endpoint: Some("_count"), entity_id: false, query: true, expected: "onGetCountWithQuery" },
            Case { method: Method::Delete, endpoint: None, entity_id: false, query: false, expected: "onDeleteAll" },
            Case { method: Method::Delete, endpoint: None, entity_id: true, query: false, expected: "onDeleteById" },
            Case { method: Method::Delete, endpoint: None, entity_id: false, query: true, expected: "onDeleteByQuery" },
        ];

        for case in cases {
            let data = engine();
            let hit = Arc::new(Mutex::new(String::new()));
            let object = data.registry().service_object(SERVICE_OBJECT);
            for kind in OperationKind::ALL {
                let hit = hit.clone();
                object.register(kind, move |_request, complete| {
                    let hit = hit.clone();
                    async move {
                        *hit.lock() = kind.handler_name().to_string();
                        complete.ok().done()
                    }
                });
            }

            let mut task = sample_task(case.method);
            task.endpoint = case.endpoint.map(str::to_string);
            if !case.entity_id {
                task.request.entity_id = None;
            }
            if case.query {
                task.request.query = Some(json!({}));
                task.query = Some(json!({}));
            }

            data.process(&task, &modules()).await.unwrap();
            assert_eq!(*hit.lock(), case.expected, "method {:?}", case.method);
        }
    }

    #[tokio::test]
    async fn query_from_root_only_reaches_the_handler() {
        let data = engine();
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        data.registry()
            .service_object(SERVICE_OBJECT)
            .on_get_by_query(move |request, complete| {
                let captured = captured.clone();
                async move {
                    *captured.lock() = request.query.clone();
                    complete.ok().done()
                }
            });

        let mut task = sample_task(Method::Get);
        task.request.entity_id = None;
        task.query = Some(json!({ "foo": "bar" }));

        data.process(&task, &modules()).await.unwrap();
        assert_eq!(*seen.lock(), Some(json!({ "foo": "bar" })));
    }

    #[tokio::test]
    async fn query_from_nested_request_only_reaches_the_handler() {
        let data = engine();
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        data.registry()
            .service_object(SERVICE_OBJECT)
            .on_get_by_query(move |request, complete| {
                let captured = captured.clone();
                async move {
                    *captured.lock() = request.query.clone();
                    complete.ok().done()
                }
            });

        let mut task = sample_task(Method::Get);
        task.request.entity_id = None;
        task.request.query = Some(json!({ "foo": "bar" }));

        data.process(&task, &modules()).await.unwrap();
        assert_eq!(*seen.lock(), Some(json!({ "foo": "bar" })));
    }

    #[tokio::test]
    async fn missing_handler_is_a_result_not_an_error() {
        let data = engine();
        data.registry()
            .service_object(SERVICE_OBJECT)
            .on_get_all(|_request, complete| async move { complete.ok().done() });

        // GET with an entity id classifies as get-by-id, which is not
        // registered.
        let result = data
            .process(&sample_task(Method::Get), &modules())
            .await
            .unwrap();
        assert_eq!(result.response.status_code, 501);
        assert!(!result.response.continue_pipeline);
        assert_eq!(
            result.response.body,
            "{\"error\":\"NotImplemented\",\"description\":\"The request invoked a method \
             that is not implemented\",\"debug\":\"These methods are not implemented\"}"
        );
    }

    #[tokio::test]
    async fn missing_method_uses_the_error_channel() {
        let data = engine();
        data.registry()
            .service_object(SERVICE_OBJECT)
            .on_insert(|_request, complete| async move { complete.ok().done() });

        let mut task = sample_task(Method::Post);
        task.method = None;

        let err = data.process(&task, &modules()).await.unwrap_err();
        assert_eq!(
            err.response.body.debug,
            Some(json!("Cannot determine data operation"))
        );
        assert_eq!(err.response.status_code, 400);
    }

    #[tokio::test]
    async fn non_json_body_uses_the_error_channel() {
        let data = engine();
        data.registry()
            .service_object(SERVICE_OBJECT)
            .on_insert(|_request, complete| async move { complete.ok().done() });

        let mut task = sample_task(Method::Post);
        task.request.body = Some(json!("this is some string"));

        let err = data.process(&task, &modules()).await.unwrap_err();
        assert_eq!(err.response.body.debug, Some(json!("Request body is not JSON")));
    }

    #[tokio::test]
    async fn structured_body_is_parsed_through_to_the_handler() {
        let data = engine();
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        data.registry()
            .service_object(SERVICE_OBJECT)
            .on_insert(move |request, complete| {
                let captured = captured.clone();
                async move {
                    *captured.lock() = request.body.clone();
                    complete.respond(json!({ "saved": true })).created().next()
                }
            });

        let mut task = sample_task(Method::Post);
        task.request.body = Some(json!("{\"title\":\"Dune\"}"));

        let result = data.process(&task, &modules()).await.unwrap();
        assert_eq!(*seen.lock(), Some(json!({ "title": "Dune" })));
        assert_eq!(result.response.status_code, 201);
        assert_eq!(result.response.body, "{\"saved\":true}");
    }

    #[tokio::test]
    async fn handler_error_statuses_flow_through_the_success_channel() {
        let cases: [(&str, u16, fn(Completion) -> Completion); 7] = [
            ("BadRequest", 400, |c| c.bad_request()),
            ("InvalidCredentials", 401, |c| c.unauthorized()),
            ("Forbidden", 403, |c| c.forbidden()),
            ("NotFound", 404, |c| c.not_found()),
            ("NotAllowed", 405, |c| c.not_allowed()),
            ("NotImplemented", 501, |c| c.not_implemented()),
            ("DataLinkRuntimeError", 550, |c| c.runtime_error()),
        ];

        for (kind, code, classify_completion) in cases {
            let data = engine();
            data.registry()
                .service_object(SERVICE_OBJECT)
                .on_insert(move |_request, complete| async move {
                    classify_completion(complete.respond("handler detail")).next()
                });

            let result = data
                .process(&sample_task(Method::Post), &modules())
                .await
                .unwrap();
            assert_eq!(result.response.status_code, code);
            let body: serde_json::Value = serde_json::from_str(&result.response.body).unwrap();
            assert_eq!(body["error"], kind);
            assert_eq!(body["debug"], "handler detail");
        }
    }

    #[tokio::test]
    async fn continuation_flag_is_mirrored() {
        for (finalize, expected) in [(true, true), (false, false)] {
            let data = engine();
            data.registry()
                .service_object(SERVICE_OBJECT)
                .on_insert(move |_request, complete| async move {
                    let complete = complete.respond(json!({ "foo": "bar" })).ok();
                    if finalize {
                        complete.next()
                    } else {
                        complete.done()
                    }
                });

            let result = data
                .process(&sample_task(Method::Post), &modules())
                .await
                .unwrap();
            assert_eq!(result.response.continue_pipeline, expected);
            assert_eq!(result.response.body, "{\"foo\":\"bar\"}");
        }
    }

    #[tokio::test]
    async fn handler_may_finalize_from_an_async_continuation() {
        let data = engine();
        data.registry()
            .service_object(SERVICE_OBJECT)
            .on_insert(|_request, complete| async move {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                complete.respond(json!({ "late": true })).ok().done()
            });

        let result = data
            .process(&sample_task(Method::Post), &modules())
            .await
            .unwrap();
        assert_eq!(result.response.body, "{\"late\":true}");
    }

    #[tokio::test]
    async fn open_completion_with_no_status_becomes_a_runtime_error_result() {
        let data = engine();
        data.registry()
            .service_object(SERVICE_OBJECT)
            .on_insert(|_request, complete| async move { complete });

        let result = data
            .process(&sample_task(Method::Post), &modules())
            .await
            .unwrap();
        assert_eq!(result.response.status_code, 550);
        let body: serde_json::Value = serde_json::from_str(&result.response.body).unwrap();
        assert_eq!(body["error"], "DataLinkRuntimeError");
        assert_eq!(body["debug"], "Response was not completed");
    }
}
