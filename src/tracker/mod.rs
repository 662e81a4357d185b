//! Per-stage execution timing and performance diagnostics.

pub mod stage;
#[allow(clippy::module_inception)]
pub mod tracker;

pub use stage::{PipelineStage, StageHandle, StageRecord};
pub use tracker::{ExecutionTrace, PerformanceReport, PipelineTracker, StageStats};
