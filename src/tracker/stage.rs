//! Pipeline stage definitions and per-stage records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// The four phases every reconciliation execution passes through, in
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Validate,
    Extract,
    Classify,
    Persist,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 4] = [
        Self::Validate,
        Self::Extract,
        Self::Classify,
        Self::Persist,
    ];
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validate => write!(f, "VALIDATE"),
            Self::Extract => write!(f, "EXTRACT"),
            Self::Classify => write!(f, "CLASSIFY"),
            Self::Persist => write!(f, "PERSIST"),
        }
    }
}

/// Live handle for a stage in flight. Consumed by
/// [`PipelineTracker::complete_stage`](crate::tracker::PipelineTracker::complete_stage).
#[derive(Debug)]
pub struct StageHandle {
    pub(crate) execution_id: Uuid,
    pub(crate) stage: PipelineStage,
    pub(crate) started: Instant,
    pub(crate) started_at: DateTime<Utc>,
}

impl StageHandle {
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }
}

/// Completed-stage record kept in execution traces and the per-stage
/// history.
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub stage: PipelineStage,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub success: bool,
    pub items_processed: u64,
}
