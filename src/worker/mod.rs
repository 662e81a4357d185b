//! # Worker Pool
//!
//! Async workers that drain the job queue and drive each document through
//! the reconciliation pipeline.

pub mod pool;
pub mod processor;

pub use pool::WorkerPool;
pub use processor::{DocumentProcessor, ProcessOutcome};
