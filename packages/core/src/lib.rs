//! Datalink Core — task envelope, response shapes, and the status vocabulary.
//!
//! This crate holds the wire-shaped data model shared between the dispatch
//! engine and the task receiver transport. It contains no I/O and no state.

pub mod response;
pub mod status;
pub mod task;

pub use response::{TaskResponse, TaskResult};
pub use status::{CompletionStatus, ErrorBody};
pub use task::{AppMetadata, Method, Task, TaskRequest, TaskType, COUNT_ENDPOINT};
