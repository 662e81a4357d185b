//! # HTTP Surface
//!
//! Thin axum layer over the queue, task store, and tracker. Handlers
//! translate between JSON and the typed core; no business logic lives
//! here.

pub mod errors;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/jobs", post(handlers::jobs::submit_job))
        .route("/api/jobs/:job_id", get(handlers::jobs::get_job))
        .route("/api/queue/stats", get(handlers::jobs::queue_stats))
        .route("/api/dlq", get(handlers::dlq::list_dead_letters))
        .route("/api/dlq/resolve", post(handlers::dlq::resolve_dead_letter))
        .route("/api/tasks", get(handlers::tasks::list_tasks))
        .route("/api/tasks/:task_id", get(handlers::tasks::get_task))
        .route(
            "/api/tasks/:task_id/decision",
            post(handlers::tasks::submit_decision),
        )
        .route("/api/pipeline/report", get(handlers::health::pipeline_report))
        .with_state(state)
}
