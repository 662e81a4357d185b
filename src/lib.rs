#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Recon Core
//!
//! In-process core of an invoice reconciliation service: documents are
//! ingested as prioritized jobs, driven through a four-stage pipeline
//! (validate, extract, classify, persist), and matched against a
//! partner's open ledger items with a deterministic rule engine.
//!
//! ## Module Organization
//!
//! - [`models`] - Typed records shared across the pipeline
//! - [`matching`] - Deterministic GREEN/YELLOW/RED match classification
//! - [`queue`] - Priority job queue with retry, backoff, and dead letters
//! - [`tracker`] - Per-stage timing, percentile stats, bottleneck detection
//! - [`store`] - Task lifecycle store with optimistic versioning
//! - [`worker`] - Async worker pool driving the pipeline
//! - [`resilience`] - Circuit breakers for external collaborators
//! - [`services`] - Collaborator traits and in-process fixtures
//! - [`web`] - HTTP surface over the core
//!
//! ## Design Principles
//!
//! - **Deterministic matching**: the same header and candidate set always
//!   classifies identically; no wall-clock or randomness in the engine
//! - **At-least-once processing**: jobs may run more than once, so every
//!   pipeline step tolerates re-execution
//! - **Optimistic task writes**: concurrent workers and reviewers are
//!   serialized by version checks, never by long-held locks

pub mod config;
pub mod error;
pub mod logging;
pub mod matching;
pub mod models;
pub mod queue;
pub mod resilience;
pub mod services;
pub mod store;
pub mod tracker;
pub mod web;
pub mod worker;

pub use config::ReconConfig;
pub use error::{ReconError, Result};
