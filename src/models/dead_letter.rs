//! Dead-letter entries: jobs that exhausted retries (or failed
//! non-recoverably), awaiting manual resolution.

use crate::models::job::JobPriority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DlqStatus {
    PendingReview,
    Resolved,
}

impl fmt::Display for DlqStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingReview => write!(f, "PENDING_REVIEW"),
            Self::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// Resolution action for a dead-lettered job. `Retry` re-queues the
/// payload as a brand-new job; `Discard` closes the entry with no new job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DlqAction {
    Retry,
    Discard,
}

/// Created exactly once per dead-lettered job, deduplicated by
/// `original_job_id` at the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub dlq_id: Uuid,
    pub original_job_id: Uuid,
    pub task_id: Uuid,
    pub payload_ref: String,
    /// Priority the original job ran at, reused when re-queued.
    pub priority: JobPriority,
    pub error: String,
    pub retry_count: u32,
    pub status: DlqStatus,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
