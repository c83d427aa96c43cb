//! Shared request plumbing for the backend store modules: URL joining,
//! credential selection, standard headers, and backend error mapping.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

/// Header carrying the backend API version for every store request.
pub const API_VERSION_HEADER: &str = "X-Datalink-API-Version";
/// Header asking the backend to skip collection hooks for this request.
pub const SKIP_BL_HEADER: &str = "X-Datalink-Skip-Business-Logic";

// ---------------------------------------------------------------------------
// Options and credentials
// ---------------------------------------------------------------------------

/// Options accepted by the store factories.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Authenticate with the environment's master secret instead of the
    /// calling user's session.
    pub use_master_secret: bool,
    /// Skip backend-side business logic for requests from this store.
    pub skip_business_logic: bool,
}

/// Credential source for one backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    /// Basic pair `environment:appsecret`.
    App,
    /// Basic pair `environment:mastersecret`.
    Master,
    /// The calling user's own authorization header, forwarded verbatim.
    Session,
}

impl Credentials {
    /// Store-level credential selection: master secret when requested,
    /// otherwise the caller's session.
    #[must_use]
    pub(crate) fn for_options(options: StoreOptions) -> Self {
        if options.use_master_secret {
            Self::Master
        } else {
            Self::Session
        }
    }
}

// ---------------------------------------------------------------------------
// ModuleError
// ---------------------------------------------------------------------------

/// Errors surfaced by the backend store modules.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The task did not carry a metadata field the backend call needs.
    #[error("task metadata is missing {field}, required for backend calls")]
    MissingMetadata { field: &'static str },
    /// The operation addresses a single entity but no id was supplied.
    #[error("an entity id is required for {operation}")]
    MissingEntityId { operation: &'static str },
    /// Transport-level failure from the HTTP client.
    #[error("backend request failed")]
    Http(#[from] reqwest::Error),
    /// The backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Backend { status: u16, body: Value },
}

// ---------------------------------------------------------------------------
// BackendClient
// ---------------------------------------------------------------------------

/// One configured client for the hosting backend, scoped to an environment.
///
/// Cheap to clone; the underlying `reqwest::Client` is shared.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    environment_id: String,
    appsecret: Option<String>,
    mastersecret: Option<String>,
    authorization: Option<String>,
    api_version: i64,
}

impl BackendClient {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: &str,
        environment_id: String,
        appsecret: Option<String>,
        mastersecret: Option<String>,
        authorization: Option<String>,
        api_version: i64,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            environment_id,
            appsecret,
            mastersecret,
            authorization,
            api_version,
        }
    }

    pub(crate) fn environment_id(&self) -> &str {
        &self.environment_id
    }

    /// Absolute URL for a backend path (`path` must start with `/`).
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Serializes a query filter into the `query` request parameter.
    pub(crate) fn query_param(query: &Value) -> (&'static str, String) {
        ("query", query.to_string())
    }

    /// Resolves the Authorization header value for the selected credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::MissingMetadata`] when the selected source is
    /// not present on the task (absent secret or session header).
    pub(crate) fn authorization_header(
        &self,
        credentials: Credentials,
    ) -> Result<String, ModuleError> {
        match credentials {
            Credentials::App => {
                let secret = self
                    .appsecret
                    .as_deref()
                    .ok_or(ModuleError::MissingMetadata { field: "appsecret" })?;
                Ok(basic(&self.environment_id, secret))
            }
            Credentials::Master => {
                let secret = self.mastersecret.as_deref().ok_or(
                    ModuleError::MissingMetadata {
                        field: "mastersecret",
                    },
                )?;
                Ok(basic(&self.environment_id, secret))
            }
            Credentials::Session => self.authorization.clone().ok_or(
                ModuleError::MissingMetadata {
                    field: "authorization",
                },
            ),
        }
    }

    /// Sends one JSON request and maps the response.
    ///
    /// Success bodies parse to a [`Value`] (`null` for empty bodies);
    /// non-success statuses map to [`ModuleError::Backend`] carrying the
    /// parsed error body.
    pub(crate) async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
        credentials: Credentials,
        skip_business_logic: bool,
    ) -> Result<Value, ModuleError> {
        let mut request = self
            .http
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .header(API_VERSION_HEADER, self.api_version.to_string())
            .header(AUTHORIZATION, self.authorization_header(credentials)?);
        if skip_business_logic {
            request = request.header(SKIP_BL_HEADER, "true");
        }
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let value = if text.is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(parsed) => parsed,
                Err(_) => Value::String(text),
            }
        };

        if status.is_success() {
            Ok(value)
        } else {
            Err(ModuleError::Backend {
                status: status.as_u16(),
                body: value,
            })
        }
    }
}

fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Request parameters for an optional query filter.
pub(crate) fn query_params(query: Option<&Value>) -> Vec<(&'static str, String)> {
    query.map(BackendClient::query_param).into_iter().collect()
}

/// Gate for by-id operations: the id must actually be there.
pub(crate) fn require_entity_id<'a>(
    entity_id: &'a str,
    operation: &'static str,
) -> Result<&'a str, ModuleError> {
    if entity_id.is_empty() {
        Err(ModuleError::MissingEntityId { operation })
    } else {
        Ok(entity_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
