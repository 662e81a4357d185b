//! # Task State Store
//!
//! Holds each document's lifecycle state. Workers apply automated
//! transitions; reviewers apply manual decisions. Every write is
//! conditional on the version the writer read and increments it under the
//! entry lock, so a retrying worker and a concurrent human decision can
//! never silently overwrite each other — the loser gets a version
//! conflict and must re-read before deciding again.

use crate::models::{
    ExtractedHeader, MatchResult, ReviewDecision, Task, TaskLifecycle,
};
use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskUpdateError {
    #[error("Task {0} not found")]
    NotFound(Uuid),

    /// The supplied `expected_version` no longer matches; the caller must
    /// re-read and retry the whole decision.
    #[error("Version conflict: expected {expected}, current {current}")]
    VersionConflict { expected: u64, current: u64 },

    #[error("Illegal lifecycle transition {from} -> {to}")]
    IllegalTransition {
        from: TaskLifecycle,
        to: TaskLifecycle,
    },
}

/// Fields applied by a successful conditional update. `None` leaves the
/// current value untouched.
#[derive(Debug, Default, Clone)]
pub struct TaskPatch {
    pub lifecycle_state: Option<TaskLifecycle>,
    pub extracted_header: Option<ExtractedHeader>,
    pub match_result: Option<MatchResult>,
    pub review: Option<ReviewDecision>,
}

#[derive(Default)]
pub struct TaskStore {
    tasks: DashMap<Uuid, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a task for a newly ingested document, starting at UPLOADED.
    pub fn create(&self, document_ref: impl Into<String>) -> Task {
        let task = Task::new(document_ref);
        info!(task_id = %task.task_id, document_ref = %task.document_ref, "Task created");
        self.tasks.insert(task.task_id, task.clone());
        task
    }

    pub fn get(&self, task_id: Uuid) -> Option<Task> {
        self.tasks.get(&task_id).map(|t| t.clone())
    }

    /// Tasks filtered by lifecycle state, newest-first.
    pub fn list(&self, state: Option<TaskLifecycle>) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| state.is_none_or(|s| t.lifecycle_state == s))
            .map(|t| t.clone())
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    /// Conditional write. Checks the version and the legality of any
    /// lifecycle transition, applies the patch, and increments the
    /// version — all under the entry lock.
    pub fn update(
        &self,
        task_id: Uuid,
        expected_version: u64,
        patch: TaskPatch,
    ) -> Result<Task, TaskUpdateError> {
        let mut task = self
            .tasks
            .get_mut(&task_id)
            .ok_or(TaskUpdateError::NotFound(task_id))?;

        if task.version != expected_version {
            debug!(
                task_id = %task_id,
                expected = expected_version,
                current = task.version,
                "Task update rejected: version conflict"
            );
            return Err(TaskUpdateError::VersionConflict {
                expected: expected_version,
                current: task.version,
            });
        }

        if let Some(target) = patch.lifecycle_state {
            if !task.lifecycle_state.can_transition_to(target) {
                return Err(TaskUpdateError::IllegalTransition {
                    from: task.lifecycle_state,
                    to: target,
                });
            }
            debug!(
                task_id = %task_id,
                from = %task.lifecycle_state,
                to = %target,
                "Task lifecycle transition"
            );
            task.lifecycle_state = target;
        }
        if let Some(header) = patch.extracted_header {
            task.extracted_header = Some(header);
        }
        if let Some(result) = patch.match_result {
            task.match_result = Some(result);
        }
        if let Some(review) = patch.review {
            task.review = Some(review);
        }

        task.version += 1;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewAction;

    fn advance(store: &TaskStore, task: &Task, state: TaskLifecycle) -> Task {
        store
            .update(
                task.task_id,
                task.version,
                TaskPatch {
                    lifecycle_state: Some(state),
                    ..TaskPatch::default()
                },
            )
            .unwrap()
    }

    #[test]
    fn test_update_increments_version() {
        let store = TaskStore::new();
        let task = store.create("blob/doc.pdf");
        assert_eq!(task.version, 1);

        let updated = advance(&store, &task, TaskLifecycle::Extracting);
        assert_eq!(updated.version, 2);
        assert_eq!(updated.lifecycle_state, TaskLifecycle::Extracting);
    }

    #[test]
    fn test_stale_version_conflicts() {
        let store = TaskStore::new();
        let task = store.create("blob/doc.pdf");
        advance(&store, &task, TaskLifecycle::Extracting);

        // A second writer holding the original snapshot loses.
        let result = store.update(
            task.task_id,
            task.version,
            TaskPatch {
                lifecycle_state: Some(TaskLifecycle::Extracting),
                ..TaskPatch::default()
            },
        );
        assert_eq!(
            result.unwrap_err(),
            TaskUpdateError::VersionConflict {
                expected: 1,
                current: 2
            }
        );
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let store = TaskStore::new();
        let task = store.create("blob/doc.pdf");
        let result = store.update(
            task.task_id,
            task.version,
            TaskPatch {
                lifecycle_state: Some(TaskLifecycle::Resolved),
                ..TaskPatch::default()
            },
        );
        assert!(matches!(
            result,
            Err(TaskUpdateError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_review_decision_from_pending_review() {
        let store = TaskStore::new();
        let mut task = store.create("blob/doc.pdf");
        task = advance(&store, &task, TaskLifecycle::Extracting);
        task = advance(&store, &task, TaskLifecycle::Matching);
        task = advance(&store, &task, TaskLifecycle::PendingReview);

        let resolved = store
            .update(
                task.task_id,
                task.version,
                TaskPatch {
                    lifecycle_state: Some(TaskLifecycle::Resolved),
                    review: Some(ReviewDecision {
                        action: ReviewAction::Approve,
                        selected_match_ref: Some("101".to_string()),
                        notes: None,
                        decided_at: Utc::now(),
                    }),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        assert_eq!(resolved.lifecycle_state, TaskLifecycle::Resolved);
        assert!(resolved.review.is_some());
    }

    #[test]
    fn test_list_filters_by_state() {
        let store = TaskStore::new();
        let task = store.create("blob/a.pdf");
        store.create("blob/b.pdf");
        advance(&store, &task, TaskLifecycle::Extracting);

        assert_eq!(store.list(Some(TaskLifecycle::Uploaded)).len(), 1);
        assert_eq!(store.list(Some(TaskLifecycle::Extracting)).len(), 1);
        assert_eq!(store.list(None).len(), 2);
    }
}
