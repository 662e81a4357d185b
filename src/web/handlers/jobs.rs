//! Job submission and inspection endpoints.

use crate::models::{Job, JobPriority, QueueStats};
use crate::web::errors::ApiError;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct SubmitJobRequest {
    pub document_ref: String,
    #[serde(default)]
    pub priority: JobPriority,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Serialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    pub task_id: Uuid,
}

/// POST /api/jobs — accept a document for reconciliation. Creates the
/// task record first so the job always references an existing task.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
    if request.document_ref.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "document_ref must not be empty".to_string(),
        ));
    }
    let task = state.tasks.create(request.document_ref.clone());
    let job_id = state.queue.enqueue(
        task.task_id,
        request.document_ref,
        request.priority,
        request.tags,
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            job_id,
            task_id: task.task_id,
        }),
    ))
}

/// GET /api/jobs/:job_id — full job record including transition history.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    state
        .queue
        .job(job_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No job {job_id}")))
}

/// GET /api/queue/stats — per-priority queue counters.
pub async fn queue_stats(
    State(state): State<AppState>,
) -> Json<HashMap<JobPriority, QueueStats>> {
    Json(state.queue.stats())
}
