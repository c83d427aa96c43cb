//! Per-cycle backend module injection.
//!
//! A [`ModuleContext`] is generated once per dispatch cycle from the task's
//! environment metadata and caller identity, and exposed to handlers through
//! the request view. It is the only way handler code reaches the backend
//! stores; handlers never see raw credentials or the shared HTTP client.

use std::sync::Arc;

use datalink_core::{AppMetadata, Task};

use crate::config::ServiceConfig;

pub mod client;
pub mod data_store;
pub mod user_store;

pub use client::{BackendClient, Credentials, ModuleError, StoreOptions};
pub use data_store::{CollectionStore, DataStore};
pub use user_store::UserStore;

// ---------------------------------------------------------------------------
// RequestContext
// ---------------------------------------------------------------------------

/// Caller identity and request-scoped metadata propagated to backend calls.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub authenticated_username: Option<String>,
    pub authenticated_user_id: Option<String>,
    pub api_version: i64,
    /// The caller's authorization header, forwarded verbatim on
    /// session-credentialed backend requests.
    pub authorization: Option<String>,
}

// ---------------------------------------------------------------------------
// ModuleContext
// ---------------------------------------------------------------------------

/// Backend context for one dispatch cycle. Cheap to clone (shared inner).
#[derive(Debug, Clone)]
pub struct ModuleContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    app_metadata: AppMetadata,
    request_context: RequestContext,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl ModuleContext {
    /// Generates the context for `task`.
    ///
    /// The backend base URL comes from the service config when overridden,
    /// otherwise from the task's environment metadata. The caller's
    /// authorization header is taken from the nested request headers.
    #[must_use]
    pub fn generate(task: &Task, http: reqwest::Client, config: &ServiceConfig) -> Self {
        let headers = &task.request.headers;
        let authorization = headers
            .get("authorization")
            .or_else(|| headers.get("Authorization"))
            .cloned();
        let base_url = config
            .baas_url
            .clone()
            .or_else(|| task.app_metadata.baas_url.clone());
        let request_context = RequestContext {
            authenticated_username: task
                .app_metadata
                .authenticated_username
                .clone()
                .or_else(|| task.request.username.clone()),
            authenticated_user_id: task.request.user_id.clone(),
            api_version: task
                .app_metadata
                .api_version
                .unwrap_or(config.default_api_version),
            authorization,
        };
        Self {
            inner: Arc::new(ContextInner {
                app_metadata: task.app_metadata.clone(),
                request_context,
                base_url,
                http,
            }),
        }
    }

    /// Environment metadata the task arrived with.
    #[must_use]
    pub fn app_metadata(&self) -> &AppMetadata {
        &self.inner.app_metadata
    }

    /// Caller identity for this cycle.
    #[must_use]
    pub fn request_context(&self) -> &RequestContext {
        &self.inner.request_context
    }

    /// User store bound to this cycle's environment and credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::MissingMetadata`] when the task carries no
    /// backend base URL or no environment id.
    pub fn user_store(&self, options: StoreOptions) -> Result<UserStore, ModuleError> {
        Ok(UserStore::new(self.backend_client()?, options))
    }

    /// Data store bound to this cycle's environment and credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::MissingMetadata`] when the task carries no
    /// backend base URL or no environment id.
    pub fn data_store(&self, options: StoreOptions) -> Result<DataStore, ModuleError> {
        Ok(DataStore::new(self.backend_client()?, options))
    }

    fn backend_client(&self) -> Result<BackendClient, ModuleError> {
        let inner = &self.inner;
        let base_url = inner
            .base_url
            .as_deref()
            .ok_or(ModuleError::MissingMetadata { field: "baasUrl" })?;
        let environment_id = inner
            .app_metadata
            .id
            .clone()
            .ok_or(ModuleError::MissingMetadata { field: "_id" })?;
        Ok(BackendClient::new(
            inner.http.clone(),
            base_url,
            environment_id,
            inner.app_metadata.appsecret.clone(),
            inner.app_metadata.mastersecret.clone(),
            inner.request_context.authorization.clone(),
            inner.request_context.api_version,
        ))
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::generate(
            &Task::default(),
            reqwest::Client::new(),
            &ServiceConfig::default(),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use datalink_core::TaskRequest;

    use super::*;

    fn task_with_metadata() -> Task {
        Task {
            app_metadata: AppMetadata {
                id: Some("kid1234".to_string()),
                appsecret: Some("123456".to_string()),
                mastersecret: Some("789012".to_string()),
                authenticated_username: Some("test@test.com".to_string()),
                baas_url: Some("https://baas.example.com".to_string()),
                api_version: Some(3),
            },
            request: TaskRequest {
                headers: [("authorization".to_string(), "Session abc".to_string())]
                    .into_iter()
                    .collect(),
                user_id: Some("1234abcd".to_string()),
                ..TaskRequest::default()
            },
            ..Task::default()
        }
    }

    #[test]
    fn generates_identity_from_the_task() {
        let context = ModuleContext::generate(
            &task_with_metadata(),
            reqwest::Client::new(),
            &ServiceConfig::default(),
        );
        let identity = context.request_context();
        assert_eq!(
            identity.authenticated_username.as_deref(),
            Some("test@test.com")
        );
        assert_eq!(identity.authenticated_user_id.as_deref(), Some("1234abcd"));
        assert_eq!(identity.api_version, 3);
        assert_eq!(identity.authorization.as_deref(), Some("Session abc"));
    }

    #[test]
    fn config_base_url_overrides_task_metadata() {
        let config = ServiceConfig {
            baas_url: Some("https://staging.example.com".to_string()),
            ..ServiceConfig::default()
        };
        let context =
            ModuleContext::generate(&task_with_metadata(), reqwest::Client::new(), &config);
        assert_eq!(
            context.inner.base_url.as_deref(),
            Some("https://staging.example.com")
        );
    }

    #[test]
    fn stores_require_environment_metadata() {
        let context = ModuleContext::for_tests();
        let err = context.user_store(StoreOptions::default()).unwrap_err();
        assert!(matches!(err, ModuleError::MissingMetadata { .. }));
        let err = context.data_store(StoreOptions::default()).unwrap_err();
        assert!(matches!(err, ModuleError::MissingMetadata { .. }));
    }

    #[test]
    fn stores_build_when_metadata_is_present() {
        let context = ModuleContext::generate(
            &task_with_metadata(),
            reqwest::Client::new(),
            &ServiceConfig::default(),
        );
        assert!(context.user_store(StoreOptions::default()).is_ok());
        assert!(context.data_store(StoreOptions::default()).is_ok());
    }

    #[test]
    fn default_api_version_fills_the_gap() {
        let mut task = task_with_metadata();
        task.app_metadata.api_version = None;
        let context =
            ModuleContext::generate(&task, reqwest::Client::new(), &ServiceConfig::default());
        assert_eq!(context.request_context().api_version, 3);
    }
}
