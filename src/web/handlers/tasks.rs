//! Task inspection and human review endpoints.

use crate::models::{ReviewAction, ReviewDecision, Task, TaskLifecycle};
use crate::store::TaskPatch;
use crate::web::errors::ApiError;
use crate::web::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct ListTasksQuery {
    pub state: Option<TaskLifecycle>,
}

/// GET /api/tasks?state=PENDING_REVIEW — tasks by lifecycle state,
/// newest first. Without a filter the review queue is returned, since
/// that is what the review UI polls for.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> Json<Vec<Task>> {
    let filter = query.state.or(Some(TaskLifecycle::PendingReview));
    Json(state.tasks.list(filter))
}

/// GET /api/tasks/:task_id
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    state
        .tasks
        .get(task_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No task {task_id}")))
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    /// Version the reviewer read. A stale version is rejected with 409
    /// so the reviewer re-reads before deciding again.
    pub expected_version: u64,
    pub action: ReviewAction,
    /// For approvals, omitting this confirms the engine's top-ranked
    /// candidate.
    pub selected_match_ref: Option<String>,
    pub notes: Option<String>,
}

/// POST /api/tasks/:task_id/decision — apply a human review decision to
/// a PENDING_REVIEW task.
pub async fn submit_decision(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .tasks
        .get(task_id)
        .ok_or_else(|| ApiError::NotFound(format!("No task {task_id}")))?;
    let target = match request.action {
        ReviewAction::Approve => TaskLifecycle::Resolved,
        ReviewAction::Reject => TaskLifecycle::Rejected,
    };
    let selected_match_ref = match request.action {
        ReviewAction::Approve => request.selected_match_ref.or_else(|| {
            task.match_result
                .as_ref()
                .and_then(|r| r.matched_item_ref.clone())
        }),
        ReviewAction::Reject => request.selected_match_ref,
    };
    let updated = state.tasks.update(
        task_id,
        request.expected_version,
        TaskPatch {
            lifecycle_state: Some(target),
            review: Some(ReviewDecision {
                action: request.action,
                selected_match_ref,
                notes: request.notes,
                decided_at: Utc::now(),
            }),
            ..TaskPatch::default()
        },
    )?;
    Ok(Json(updated))
}
