//! Task classification: derives the canonical operation kind from a task's
//! verb, entity id, query, and endpoint marker.

use datalink_core::{Method, Task};

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// Canonical classification of an inbound data task.
///
/// Exactly one kind is selected per task, or none (see [`ClassifyError`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insert,
    Update,
    DeleteAll,
    DeleteById,
    DeleteByQuery,
    GetAll,
    GetById,
    GetByQuery,
    GetCount,
    GetCountWithQuery,
}

impl OperationKind {
    /// All kinds, in registration-surface order.
    pub const ALL: [Self; 10] = [
        Self::Insert,
        Self::Update,
        Self::DeleteAll,
        Self::DeleteById,
        Self::DeleteByQuery,
        Self::GetAll,
        Self::GetById,
        Self::GetByQuery,
        Self::GetCount,
        Self::GetCountWithQuery,
    ];

    /// Name of the registration method bound to this kind.
    #[must_use]
    pub const fn handler_name(self) -> &'static str {
        match self {
            Self::Insert => "onInsert",
            Self::Update => "onUpdate",
            Self::DeleteAll => "onDeleteAll",
            Self::DeleteById => "onDeleteById",
            Self::DeleteByQuery => "onDeleteByQuery",
            Self::GetAll => "onGetAll",
            Self::GetById => "onGetById",
            Self::GetByQuery => "onGetByQuery",
            Self::GetCount => "onGetCount",
            Self::GetCountWithQuery => "onGetCountWithQuery",
        }
    }

    /// Inverse of [`Self::handler_name`], for string-keyed introspection.
    #[must_use]
    pub fn from_handler_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.handler_name() == name)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.handler_name())
    }
}

// ---------------------------------------------------------------------------
// ClassifyError
// ---------------------------------------------------------------------------

/// Indeterminate classification outcomes.
///
/// `MissingMethod` is a protocol-validation failure and surfaces through the
/// dispatcher's error channel; `UnsupportedMethod` falls back to the
/// not-implemented result path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    /// The task carries no verb at all, so no operation can be derived.
    #[error("Cannot determine data operation")]
    MissingMethod,
    /// The verb is outside the fixed GET/POST/PUT/DELETE set.
    #[error("the task verb has no corresponding data operation")]
    UnsupportedMethod,
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

/// Classifies a task into exactly one [`OperationKind`].
///
/// Pure over the tuple (verb, entity-id presence, query presence, endpoint
/// marker). Query and entity id are resolved with the dual-location rule
/// ([`Task::resolved_query`]): presence in either the task root or the nested
/// request object counts.
///
/// # Errors
///
/// Returns [`ClassifyError::MissingMethod`] when the task has no verb and
/// [`ClassifyError::UnsupportedMethod`] for verbs outside the fixed set.
pub fn classify(task: &Task) -> Result<OperationKind, ClassifyError> {
    let Some(method) = task.method else {
        return Err(ClassifyError::MissingMethod);
    };

    let has_query = task.resolved_query().is_some();
    let has_entity_id = task.resolved_entity_id().is_some();

    match method {
        Method::Post => Ok(OperationKind::Insert),
        Method::Put => Ok(OperationKind::Update),
        Method::Delete => {
            // An id plus a query addresses a filtered delete, not a by-id one.
            if has_entity_id && !has_query {
                Ok(OperationKind::DeleteById)
            } else if has_query {
                Ok(OperationKind::DeleteByQuery)
            } else {
                Ok(OperationKind::DeleteAll)
            }
        }
        Method::Get => {
            if task.is_count_endpoint() {
                if has_query {
                    Ok(OperationKind::GetCountWithQuery)
                } else {
                    Ok(OperationKind::GetCount)
                }
            } else if has_entity_id {
                Ok(OperationKind::GetById)
            } else if has_query {
                Ok(OperationKind::GetByQuery)
            } else {
                Ok(OperationKind::GetAll)
            }
        }
        Method::Other => Err(ClassifyError::UnsupportedMethod),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
