//! Service-object registry: per-resource mapping from operation kind to the
//! registered handler callback.
//!
//! The registry is an explicit instance owned by the dispatcher, created at
//! startup, mutated during the registration phase, and read on every dispatch
//! cycle. Registration during dispatch traffic is safe: the name map is a
//! `DashMap` and each entry guards its kind slots with an `RwLock`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use parking_lot::RwLock;

use super::classify::OperationKind;
use super::completion::Completion;
use super::request::Request;

/// Boxed async callback registered for one operation kind.
///
/// A handler receives the cycle-local request view and the fresh completion
/// builder, and resolves to the (ideally finalized) builder.
pub type DataHandler =
    Arc<dyn Fn(Request, Completion) -> BoxFuture<'static, Completion> + Send + Sync>;

/// Kind-to-handler slots for a single service object.
#[derive(Default)]
struct ServiceObjectEntry {
    handlers: RwLock<HashMap<OperationKind, DataHandler>>,
}

// ---------------------------------------------------------------------------
// ServiceObjectRegistry
// ---------------------------------------------------------------------------

/// Registry of all service objects and their registered operation handlers.
pub struct ServiceObjectRegistry {
    objects: DashMap<String, Arc<ServiceObjectEntry>>,
}

impl ServiceObjectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }

    /// Returns (creating if absent) the registration handle for `name`.
    ///
    /// Idempotent: repeated calls with the same name return handles bound to
    /// the same underlying entry.
    #[must_use]
    pub fn service_object(&self, name: &str) -> ServiceObject {
        let entry = self
            .objects
            .entry(name.to_string())
            .or_default()
            .value()
            .clone();
        ServiceObject {
            name: name.to_string(),
            entry,
        }
    }

    /// Names of all registered service objects. Only set membership is part
    /// of the contract; the order is unspecified.
    #[must_use]
    pub fn service_objects(&self) -> Vec<String> {
        self.objects.iter().map(|e| e.key().clone()).collect()
    }

    /// Resets the registry to empty.
    ///
    /// Handles created before the clear keep a reference to their detached
    /// entry; registering through one mutates only that orphan and cannot
    /// resurrect the cleared name.
    pub fn clear_all(&self) {
        self.objects.clear();
    }

    /// Looks up the handler for `(name, kind)` without invoking it.
    pub(crate) fn handler(&self, name: &str, kind: OperationKind) -> Option<DataHandler> {
        let entry = self.objects.get(name)?.value().clone();
        let handler = entry.handlers.read().get(&kind).cloned();
        handler
    }
}

impl Default for ServiceObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ServiceObject
// ---------------------------------------------------------------------------

/// Registration handle for one named service object.
///
/// Exposes one registration method per operation kind. Registering twice for
/// the same kind replaces the previous callback; last write wins.
pub struct ServiceObject {
    name: String,
    entry: Arc<ServiceObjectEntry>,
}

impl ServiceObject {
    /// The service-object name this handle is bound to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers `handler` for `kind`, replacing any previous registration.
    pub fn register<F, Fut>(&self, kind: OperationKind, handler: F) -> &Self
    where
        F: Fn(Request, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        let handler: DataHandler =
            Arc::new(move |request, complete| Box::pin(handler(request, complete)));
        self.entry.handlers.write().insert(kind, handler);
        self
    }

    /// Registers the insert handler.
    pub fn on_insert<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(Request, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        self.register(OperationKind::Insert, handler)
    }

    /// Registers the update handler.
    pub fn on_update<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(Request, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        self.register(OperationKind::Update, handler)
    }

    /// Registers the delete-all handler.
    pub fn on_delete_all<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(Request, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        self.register(OperationKind::DeleteAll, handler)
    }

    /// Registers the delete-by-id handler.
    pub fn on_delete_by_id<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(Request, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        self.register(OperationKind::DeleteById, handler)
    }

    /// Registers the delete-by-query handler.
    pub fn on_delete_by_query<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(Request, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        self.register(OperationKind::DeleteByQuery, handler)
    }

    /// Registers the get-all handler.
    pub fn on_get_all<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(Request, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        self.register(OperationKind::GetAll, handler)
    }

    /// Registers the get-by-id handler.
    pub fn on_get_by_id<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(Request, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        self.register(OperationKind::GetById, handler)
    }

    /// Registers the get-by-query handler.
    pub fn on_get_by_query<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(Request, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        self.register(OperationKind::GetByQuery, handler)
    }

    /// Registers the count handler.
    pub fn on_get_count<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(Request, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        self.register(OperationKind::GetCount, handler)
    }

    /// Registers the count-with-query handler.
    pub fn on_get_count_with_query<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(Request, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        self.register(OperationKind::GetCountWithQuery, handler)
    }

    /// Returns the currently registered handler for `kind` without invoking
    /// it. Intended for introspection and testing.
    #[must_use]
    pub fn resolve(&self, kind: OperationKind) -> Option<DataHandler> {
        self.entry.handlers.read().get(&kind).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
