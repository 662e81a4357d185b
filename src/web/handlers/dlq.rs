//! Dead-letter queue review endpoints.

use crate::models::{DeadLetterEntry, DlqAction, DlqStatus};
use crate::web::errors::ApiError;
use crate::web::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct ListDlqQuery {
    pub status: Option<DlqStatus>,
}

/// GET /api/dlq?status=PENDING_REVIEW — dead-letter entries, newest
/// first.
pub async fn list_dead_letters(
    State(state): State<AppState>,
    Query(query): Query<ListDlqQuery>,
) -> Json<Vec<DeadLetterEntry>> {
    Json(state.queue.dead_letters().list(query.status))
}

#[derive(Deserialize)]
pub struct ResolveDlqRequest {
    pub dlq_id: Uuid,
    pub action: DlqAction,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct ResolveDlqResponse {
    pub dlq_id: Uuid,
    pub action: DlqAction,
    /// Set only when the action re-queued the payload as a new job.
    pub new_job_id: Option<Uuid>,
}

/// POST /api/dlq/resolve — retry or discard a dead-lettered job. An
/// entry can be resolved exactly once; a second attempt is a conflict,
/// not a second retry job.
pub async fn resolve_dead_letter(
    State(state): State<AppState>,
    Json(request): Json<ResolveDlqRequest>,
) -> Result<Json<ResolveDlqResponse>, ApiError> {
    match state
        .queue
        .resolve_dead_letter(request.dlq_id, request.action, request.notes)
    {
        Some(resolution) => Ok(Json(ResolveDlqResponse {
            dlq_id: request.dlq_id,
            action: request.action,
            new_job_id: resolution.new_job_id,
        })),
        None => match state.queue.dead_letters().get(request.dlq_id) {
            Some(_) => Err(ApiError::Conflict(format!(
                "Dead-letter entry {} already resolved",
                request.dlq_id
            ))),
            None => Err(ApiError::NotFound(format!(
                "No dead-letter entry {}",
                request.dlq_id
            ))),
        },
    }
}
