//! Data store module: REST client for the backend's collection data.

use reqwest::Method;
use serde_json::Value;

use super::client::{
    query_params, require_entity_id, BackendClient, Credentials, ModuleError, StoreOptions,
};

/// Factory for collection-scoped stores.
///
/// Obtained from [`crate::modules::ModuleContext::data_store`].
#[derive(Debug, Clone)]
pub struct DataStore {
    client: BackendClient,
    options: StoreOptions,
}

impl DataStore {
    pub(crate) fn new(client: BackendClient, options: StoreOptions) -> Self {
        Self { client, options }
    }

    /// Store handle for one named collection.
    #[must_use]
    pub fn collection(&self, name: &str) -> CollectionStore {
        CollectionStore {
            client: self.client.clone(),
            collection: name.to_string(),
            options: self.options,
        }
    }
}

/// CRUD operations against a single backend collection.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    client: BackendClient,
    collection: String,
    options: StoreOptions,
}

impl CollectionStore {
    fn root(&self) -> String {
        format!(
            "/appdata/{}/{}/",
            self.client.environment_id(),
            self.collection
        )
    }

    fn entity_path(&self, entity_id: &str) -> String {
        format!(
            "/appdata/{}/{}/{entity_id}",
            self.client.environment_id(),
            self.collection
        )
    }

    /// Finds entities, optionally filtered by a query.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] on transport failures or non-success backend
    /// statuses (all operations on this store share these failure modes).
    pub async fn find(&self, query: Option<&Value>) -> Result<Value, ModuleError> {
        let params = query_params(query);
        self.request(Method::GET, &self.root(), &params, None).await
    }

    /// Fetches one entity by id.
    ///
    /// # Errors
    ///
    /// `MissingEntityId` when `entity_id` is empty, plus the shared modes.
    pub async fn find_by_id(&self, entity_id: &str) -> Result<Value, ModuleError> {
        let entity_id = require_entity_id(entity_id, "findById")?;
        self.request(Method::GET, &self.entity_path(entity_id), &[], None)
            .await
    }

    /// Saves an entity: updates in place when it carries an `_id`, inserts
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Shared failure modes.
    pub async fn save(&self, entity: &Value) -> Result<Value, ModuleError> {
        match entity_id_of(entity) {
            Some(id) => {
                let path = self.entity_path(id);
                self.request(Method::PUT, &path, &[], Some(entity)).await
            }
            None => {
                self.request(Method::POST, &self.root(), &[], Some(entity))
                    .await
            }
        }
    }

    /// Removes all entities matching the query.
    ///
    /// # Errors
    ///
    /// Shared failure modes.
    pub async fn remove(&self, query: &Value) -> Result<Value, ModuleError> {
        let params = query_params(Some(query));
        self.request(Method::DELETE, &self.root(), &params, None)
            .await
    }

    /// Removes one entity by id.
    ///
    /// # Errors
    ///
    /// `MissingEntityId` when `entity_id` is empty, plus the shared modes.
    pub async fn remove_by_id(&self, entity_id: &str) -> Result<Value, ModuleError> {
        let entity_id = require_entity_id(entity_id, "removeById")?;
        self.request(Method::DELETE, &self.entity_path(entity_id), &[], None)
            .await
    }

    /// Counts entities, optionally filtered by a query.
    ///
    /// # Errors
    ///
    /// Shared failure modes.
    pub async fn count(&self, query: Option<&Value>) -> Result<Value, ModuleError> {
        let path = format!(
            "/appdata/{}/{}/_count/",
            self.client.environment_id(),
            self.collection
        );
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
                Credentials::for_options(self.options),
                self.options.skip_business_logic,
            )
            .await
    }
}

/// The entity's own id, when present and non-empty. Decides whether `save`
/// inserts or updates.
fn entity_id_of(entity: &Value) -> Option<&str> {
    entity
        .get("_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
