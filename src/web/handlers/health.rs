//! Liveness and pipeline diagnostics endpoints.

use crate::tracker::PerformanceReport;
use crate::web::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Deserialize)]
pub struct ReportQuery {
    pub window_seconds: Option<u64>,
    /// Stages consuming more than this share of execution time are
    /// reported as bottlenecks. Defaults to 0.5.
    pub bottleneck_threshold: Option<f64>,
}

#[derive(Serialize)]
pub struct BottleneckEntry {
    pub stage: String,
    pub avg_share: f64,
}

#[derive(Serialize)]
pub struct PipelineReportResponse {
    #[serde(flatten)]
    pub report: PerformanceReport,
    pub bottlenecks: Vec<BottleneckEntry>,
}

/// GET /api/pipeline/report?window_seconds=3600
pub async fn pipeline_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Json<PipelineReportResponse> {
    let window = Duration::from_secs(query.window_seconds.unwrap_or(3_600));
    let threshold = query.bottleneck_threshold.unwrap_or(0.5);
    let report = state.tracker.performance_report(window);
    let bottlenecks = state
        .tracker
        .detect_bottlenecks(threshold)
        .into_iter()
        .map(|(stage, avg_share)| BottleneckEntry {
            stage: stage.to_string(),
            avg_share,
        })
        .collect();
    Json(PipelineReportResponse {
        report,
        bottlenecks,
    })
}
