//! The data dispatch engine.
//!
//! One task flows through the pipeline exactly once:
//!
//! 1. **Validation** (`dispatch`): verb presence, body JSON-ness
//! 2. **Classification** (`classify`): `Task` -> `OperationKind`
//! 3. **Registry lookup** (`registry`): (service object, kind) -> handler
//! 4. **Completion** (`completion`): the handler's fluent response builder
//! 5. **Assembly** (`dispatch`): wire response + continuation signal

pub mod classify;
pub mod completion;
pub mod dispatch;
pub mod registry;
pub mod request;

// Re-export key types for convenient access.
pub use classify::{classify, ClassifyError, OperationKind};
pub use completion::Completion;
pub use dispatch::{DataLink, ErrorResponse, ProtocolError};
pub use registry::{DataHandler, ServiceObject, ServiceObjectRegistry};
pub use request::Request;
