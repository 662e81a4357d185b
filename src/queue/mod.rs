//! Priority job queue with retry/backoff and dead-letter handling.

pub mod backoff;
pub mod dead_letter_store;
pub mod job_queue;

pub use dead_letter_store::DeadLetterStore;
pub use job_queue::{DlqResolution, JobQueue, QueueConfig};
