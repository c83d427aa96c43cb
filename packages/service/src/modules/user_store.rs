//! User store module: REST client for the backend's user collection.

use reqwest::Method;
use serde_json::Value;

use super::client::{
    query_params, require_entity_id, BackendClient, Credentials, ModuleError, StoreOptions,
};

/// Store for the environment's users.
///
/// Obtained from [`crate::modules::ModuleContext::user_store`]; scoped to one
/// dispatch cycle's credentials and options.
#[derive(Debug, Clone)]
pub struct UserStore {
    client: BackendClient,
    options: StoreOptions,
}

impl UserStore {
    pub(crate) fn new(client: BackendClient, options: StoreOptions) -> Self {
        Self { client, options }
    }

    fn credentials(&self) -> Credentials {
        Credentials::for_options(self.options)
    }

    fn root(&self) -> String {
        format!("/user/{}/", self.client.environment_id())
    }

    fn entity_path(&self, entity_id: &str) -> String {
        format!("/user/{}/{entity_id}", self.client.environment_id())
    }

    /// Finds users, optionally filtered by a query.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] on transport failures or non-success backend
    /// statuses (all operations on this store share these failure modes).
    pub async fn find(&self, query: Option<&Value>) -> Result<Value, ModuleError> {
        let params = query_params(query);
        self.request(Method::GET, &self.root(), &params, None).await
    }

    /// Fetches one user by id.
    ///
    /// # Errors
    ///
    /// `MissingEntityId` when `entity_id` is empty, plus the shared modes.
    pub async fn find_by_id(&self, entity_id: &str) -> Result<Value, ModuleError> {
        let entity_id = require_entity_id(entity_id, "findById")?;
        self.request(Method::GET, &self.entity_path(entity_id), &[], None)
            .await
    }

    /// Fetches the calling user.
    ///
    /// # Errors
    ///
    /// Shared failure modes.
    pub async fn current_user(&self) -> Result<Value, ModuleError> {
        let path = format!("/user/{}/_me", self.client.environment_id());
        self.request(Method::GET, &path, &[], None).await
    }

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Shared failure modes.
    pub async fn create(&self, user: &Value) -> Result<Value, ModuleError> {
        self.request(Method::POST, &self.root(), &[], Some(user))
            .await
    }

    /// Updates a user; the entity must carry its `_id`.
    ///
    /// # Errors
    ///
    /// `MissingEntityId` when the entity has no `_id`, plus the shared modes.
    pub async fn update(&self, user: &Value) -> Result<Value, ModuleError> {
        let entity_id = user
            .get("_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or(ModuleError::MissingEntityId {
                operation: "update",
            })?;
        let path = self.entity_path(entity_id);
        self.request(Method::PUT, &path, &[], Some(user)).await
    }

    /// Permanently removes a user.
    ///
    /// # Errors
    ///
    /// `MissingEntityId` when `entity_id` is empty, plus the shared modes.
    pub async fn remove(&self, entity_id: &str) -> Result<Value, ModuleError> {
        let entity_id = require_entity_id(entity_id, "remove")?;
        let params = [("hard", String::from("true"))];
        self.request(Method::DELETE, &self.entity_path(entity_id), &params, None)
            .await
    }

    /// Suspends a user. With `soft`, the backend keeps the account
    /// restorable.
    ///
    /// # Errors
    ///
    /// `MissingEntityId` when `entity_id` is empty, plus the shared modes.
    pub async fn suspend(&self, entity_id: &str, soft: bool) -> Result<Value, ModuleError> {
        let entity_id = require_entity_id(entity_id, "suspend")?;
        let params = if soft {
            vec![("soft", String::from("true"))]
        } else {
            Vec::new()
        };
        self.request(Method::DELETE, &self.entity_path(entity_id), &params, None)
            .await
    }

    /// Restores a suspended user. Always authenticates with the master
    /// secret; restore is not available to session callers.
    ///
    /// # Errors
    ///
    /// `MissingEntityId` when `entity_id` is empty, plus the shared modes.
    pub async fn restore(&self, entity_id: &str) -> Result<Value, ModuleError> {
        let entity_id = require_entity_id(entity_id, "restore")?;
        let path = format!(
            "/user/{}/{entity_id}/_restore",
            self.client.environment_id()
        );
        self.client
            .send(
                Method::DELETE,
                &path,
                &[],
                None,
                Credentials::Master,
                self.options.skip_business_logic,
            )
            .await
    }

    /// Counts users, optionally filtered by a query.
    ///
    /// # Errors
    ///
    /// Shared failure modes.
    pub async fn count(&self, query: Option<&Value>) -> Result<Value, ModuleError> {
        let path = format!("/user/{}/_count/", self.client.environment_id());
        let params = query_params(query);
        self.request(Method::GET, &path, &params, None).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ModuleError> {
        self.client
            .send(
                method,
                path,
                params,
                body,
                self.credentials(),
                self.options.skip_business_logic,
            )
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
