//! Task lifecycle state with optimistic concurrency control.

pub mod task_store;

pub use task_store::{TaskPatch, TaskStore, TaskUpdateError};
