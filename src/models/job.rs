//! Queue job records. A job is exclusively owned by the job queue and
//! mutated only through atomic state transitions; every transition appends
//! an immutable snapshot to the job's history so races are auditable
//! after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPriority {
    High,
    Normal,
    Low,
}

impl Default for JobPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Normal => write!(f, "NORMAL"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    /// Transient status recorded in the history when a failure report
    /// arrives, before the retry/DLQ decision is applied.
    Failed,
    Retrying,
    Dlq,
}

impl JobStatus {
    /// Terminal states admit no further transitions. DLQ resolution
    /// produces a brand-new job rather than reviving this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Dlq)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "QUEUED"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Retrying => write!(f, "RETRYING"),
            Self::Dlq => write!(f, "DLQ"),
        }
    }
}

/// Immutable record of one state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTransition {
    pub from: JobStatus,
    pub to: JobStatus,
    pub at: DateTime<Utc>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    /// Reconciliation task this job is processing.
    pub task_id: Uuid,
    pub priority: JobPriority,
    pub status: JobStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Object-storage reference of the document to process.
    pub payload_ref: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    pub last_error: Option<String>,
    #[serde(default)]
    pub history: Vec<JobTransition>,
}

impl Job {
    pub fn new(
        task_id: Uuid,
        payload_ref: impl Into<String>,
        priority: JobPriority,
        max_retries: u32,
        tags: HashMap<String, String>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            task_id,
            priority,
            status: JobStatus::Queued,
            retry_count: 0,
            max_retries,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            payload_ref: payload_ref.into(),
            tags,
            last_error: None,
            history: Vec::new(),
        }
    }

    /// Apply a transition, recording the snapshot in the history.
    pub fn transition(&mut self, to: JobStatus, error: Option<String>) {
        self.history.push(JobTransition {
            from: self.status,
            to,
            at: Utc::now(),
            error: error.clone(),
        });
        if let Some(message) = error {
            self.last_error = Some(message);
        }
        self.status = to;
    }
}

/// Per-priority queue statistics for monitoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_jobs: usize,
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub retrying: usize,
    pub dead_lettered: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_appends_history() {
        let mut job = Job::new(Uuid::new_v4(), "blob/a.pdf", JobPriority::Normal, 3, HashMap::new());
        job.transition(JobStatus::Processing, None);
        job.transition(JobStatus::Failed, Some("analyzer down".to_string()));
        job.transition(JobStatus::Retrying, None);

        assert_eq!(job.status, JobStatus::Retrying);
        assert_eq!(job.history.len(), 3);
        assert_eq!(job.history[1].from, JobStatus::Processing);
        assert_eq!(job.history[1].to, JobStatus::Failed);
        assert_eq!(job.last_error.as_deref(), Some("analyzer down"));
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Dlq.is_terminal());
        assert!(!JobStatus::Retrying.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
