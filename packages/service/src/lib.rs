//! Datalink Service — handler dispatch and response construction for a
//! backend-as-a-service business-logic runtime.
//!
//! Application code registers one async callback per operation kind on named
//! service objects; each received task then flows through the pipeline:
//!
//! 1. **Routing** (`service`): task-type routing + module-context generation
//! 2. **Classification** (`data::classify`): `Task` -> `OperationKind`
//! 3. **Registry lookup** (`data::registry`): (service object, kind) -> handler
//! 4. **Completion** (`data::completion`): the handler's fluent response builder
//! 5. **Assembly** (`data::dispatch`): wire response + continuation signal
//!
//! Backend REST collaborators (`modules`) are injected per cycle so handler
//! bodies can reach the hosting backend's user and data stores.

pub mod config;
pub mod data;
pub mod modules;
pub mod service;

// Re-export key types for convenient access.
pub use config::ServiceConfig;
pub use data::{
    classify, ClassifyError, Completion, DataHandler, DataLink, ErrorResponse, OperationKind,
    ProtocolError, Request, ServiceObject, ServiceObjectRegistry,
};
pub use modules::{ModuleContext, ModuleError, StoreOptions};
pub use service::{init_tracing, Service, ServiceError};
