//! Task lifecycle records. A task is the document's journey through the
//! pipeline; it is mutated by workers (automated transitions) and by a
//! reviewer (manual decision), with an optimistic version token guarding
//! against lost updates between the two.

use crate::models::extracted_header::ExtractedHeader;
use crate::models::match_result::MatchResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskLifecycle {
    Uploaded,
    Extracting,
    Matching,
    /// Automatic completion on a GREEN match.
    Completed,
    /// YELLOW or RED outcome awaiting a reviewer decision.
    PendingReview,
    Resolved,
    Rejected,
}

impl TaskLifecycle {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Resolved | Self::Rejected)
    }

    /// Legal lifecycle transitions. Resolved/Rejected are reachable only
    /// from PendingReview, driven by a reviewer decision.
    pub fn can_transition_to(&self, target: TaskLifecycle) -> bool {
        use TaskLifecycle::*;
        matches!(
            (self, target),
            (Uploaded, Extracting)
                | (Extracting, Matching)
                | (Matching, Completed)
                | (Matching, PendingReview)
                | (PendingReview, Resolved)
                | (PendingReview, Rejected)
        )
    }
}

impl fmt::Display for TaskLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploaded => write!(f, "UPLOADED"),
            Self::Extracting => write!(f, "EXTRACTING"),
            Self::Matching => write!(f, "MATCHING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::PendingReview => write!(f, "PENDING_REVIEW"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
}

/// Reviewer decision attached to a task when it leaves PENDING_REVIEW.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub action: ReviewAction,
    /// Reviewer-selected ledger item, overriding the top-ranked candidate.
    pub selected_match_ref: Option<String>,
    pub notes: Option<String>,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: Uuid,
    pub document_ref: String,
    pub extracted_header: Option<ExtractedHeader>,
    pub match_result: Option<MatchResult>,
    pub lifecycle_state: TaskLifecycle,
    /// Optimistic-concurrency token. Every write must supply the version
    /// it read; the store increments it atomically on success.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub review: Option<ReviewDecision>,
}

impl Task {
    pub fn new(document_ref: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4(),
            document_ref: document_ref.into(),
            extracted_header: None,
            match_result: None,
            lifecycle_state: TaskLifecycle::Uploaded,
            version: 1,
            created_at: now,
            updated_at: now,
            review: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_legality() {
        use TaskLifecycle::*;
        assert!(Uploaded.can_transition_to(Extracting));
        assert!(Extracting.can_transition_to(Matching));
        assert!(Matching.can_transition_to(Completed));
        assert!(Matching.can_transition_to(PendingReview));
        assert!(PendingReview.can_transition_to(Resolved));
        assert!(PendingReview.can_transition_to(Rejected));

        // Review decisions only apply to tasks awaiting review.
        assert!(!Completed.can_transition_to(Resolved));
        assert!(!Matching.can_transition_to(Resolved));
        assert!(!Uploaded.can_transition_to(Matching));
        assert!(!Resolved.can_transition_to(PendingReview));
    }

    #[test]
    fn test_new_task_starts_at_version_one() {
        let task = Task::new("blob/invoice.pdf");
        assert_eq!(task.lifecycle_state, TaskLifecycle::Uploaded);
        assert_eq!(task.version, 1);
        assert!(task.extracted_header.is_none());
    }
}
