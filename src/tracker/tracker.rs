//! # Pipeline Stage Tracker
//!
//! Records wall-clock duration and outcome per named stage of each
//! execution, aggregates percentile statistics over a bounded history,
//! and flags bottleneck stages. Purely diagnostic: nothing here feeds
//! back into job state.

use crate::tracker::stage::{PipelineStage, StageHandle, StageRecord};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Trace of one pipeline execution. Total duration is the sum of its
/// stage durations.
#[derive(Debug, Clone)]
pub struct ExecutionTrace {
    pub execution_id: Uuid,
    pub document_ref: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub success: Option<bool>,
    pub stages: Vec<StageRecord>,
}

impl ExecutionTrace {
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Share of total execution time spent in one stage, in [0, 1].
    pub fn stage_share(&self, stage: PipelineStage) -> f64 {
        let total = self.total_duration().as_secs_f64();
        if total == 0.0 {
            return 0.0;
        }
        let in_stage: f64 = self
            .stages
            .iter()
            .filter(|s| s.stage == stage)
            .map(|s| s.duration.as_secs_f64())
            .sum();
        in_stage / total
    }
}

/// Aggregated duration statistics for one stage, successful runs only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageStats {
    pub total_runs: usize,
    pub successful_runs: usize,
    pub failed_runs: usize,
    pub success_rate: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub total_items_processed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageBreakdown {
    pub stage: String,
    pub stats: StageStats,
}

/// Report over executions started inside the look-back window.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub window_seconds: u64,
    pub total_executions: usize,
    pub successful_executions: usize,
    pub failed_executions: usize,
    pub avg_total_ms: f64,
    pub p95_total_ms: f64,
    pub stage_breakdown: Vec<StageBreakdown>,
}

pub struct PipelineTracker {
    history_limit: usize,
    executions: Mutex<HashMap<Uuid, ExecutionTrace>>,
    stage_history: Mutex<HashMap<PipelineStage, VecDeque<StageRecord>>>,
}

impl PipelineTracker {
    pub fn new(history_limit: usize) -> Self {
        Self {
            history_limit,
            executions: Mutex::new(HashMap::new()),
            stage_history: Mutex::new(HashMap::new()),
        }
    }

    pub fn start_execution(&self, document_ref: impl Into<String>) -> Uuid {
        let execution_id = Uuid::new_v4();
        let trace = ExecutionTrace {
            execution_id,
            document_ref: document_ref.into(),
            started_at: Utc::now(),
            completed_at: None,
            success: None,
            stages: Vec::new(),
        };
        debug!(execution_id = %execution_id, "▶️ Pipeline execution started");
        self.executions.lock().insert(execution_id, trace);
        execution_id
    }

    /// Begin timing a stage. Returns `None` for an unknown execution.
    pub fn start_stage(&self, execution_id: Uuid, stage: PipelineStage) -> Option<StageHandle> {
        if !self.executions.lock().contains_key(&execution_id) {
            warn!(execution_id = %execution_id, "Stage started for unknown execution");
            return None;
        }
        Some(StageHandle {
            execution_id,
            stage,
            started: Instant::now(),
            started_at: Utc::now(),
        })
    }

    /// Close out a stage, recording its duration in the execution trace
    /// and the bounded per-stage history.
    pub fn complete_stage(&self, handle: StageHandle, success: bool, items_processed: u64) {
        let record = StageRecord {
            stage: handle.stage,
            started_at: handle.started_at,
            duration: handle.started.elapsed(),
            success,
            items_processed,
        };
        debug!(
            execution_id = %handle.execution_id,
            stage = %record.stage,
            duration_ms = record.duration.as_millis() as u64,
            success,
            "Stage completed"
        );

        if let Some(trace) = self.executions.lock().get_mut(&handle.execution_id) {
            trace.stages.push(record.clone());
        }

        let mut history = self.stage_history.lock();
        let entries = history.entry(record.stage).or_default();
        entries.push_back(record);
        while entries.len() > self.history_limit {
            entries.pop_front();
        }
    }

    pub fn complete_execution(&self, execution_id: Uuid, success: bool) -> Option<ExecutionTrace> {
        let mut executions = self.executions.lock();
        let trace = executions.get_mut(&execution_id)?;
        trace.completed_at = Some(Utc::now());
        trace.success = Some(success);
        info!(
            execution_id = %execution_id,
            total_ms = trace.total_duration().as_millis() as u64,
            success,
            "⏹️ Pipeline execution completed"
        );
        let snapshot = trace.clone();

        // Keep the trace map bounded: evict the oldest completed traces
        // once the limit is exceeded; in-flight executions are never
        // evicted.
        if executions.len() > self.history_limit {
            let mut completed: Vec<(Uuid, DateTime<Utc>)> = executions
                .iter()
                .filter(|(id, t)| t.completed_at.is_some() && **id != execution_id)
                .map(|(id, t)| (*id, t.started_at))
                .collect();
            completed.sort_by_key(|(_, started_at)| *started_at);
            let excess = executions.len() - self.history_limit;
            for (id, _) in completed.into_iter().take(excess) {
                executions.remove(&id);
            }
        }
        Some(snapshot)
    }

    pub fn execution(&self, execution_id: Uuid) -> Option<ExecutionTrace> {
        self.executions.lock().get(&execution_id).cloned()
    }

    /// Percentile statistics for one stage over its retained history.
    pub fn stage_stats(&self, stage: PipelineStage) -> StageStats {
        let history = self.stage_history.lock();
        let Some(records) = history.get(&stage) else {
            return StageStats::default();
        };

        let successful: Vec<f64> = records
            .iter()
            .filter(|r| r.success)
            .map(|r| r.duration.as_secs_f64() * 1000.0)
            .collect();
        let failed = records.len() - successful.len();

        let mut stats = StageStats {
            total_runs: records.len(),
            successful_runs: successful.len(),
            failed_runs: failed,
            success_rate: if records.is_empty() {
                0.0
            } else {
                successful.len() as f64 / records.len() as f64
            },
            total_items_processed: records.iter().map(|r| r.items_processed).sum(),
            ..StageStats::default()
        };
        if successful.is_empty() {
            return stats;
        }

        let mut durations = successful;
        durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        stats.min_ms = durations[0];
        stats.max_ms = durations[durations.len() - 1];
        stats.avg_ms = durations.iter().sum::<f64>() / durations.len() as f64;
        stats.median_ms = percentile(&durations, 0.50);
        stats.p95_ms = percentile(&durations, 0.95);
        stats.p99_ms = percentile(&durations, 0.99);
        stats
    }

    /// Aggregate report over executions started inside the window.
    pub fn performance_report(&self, window: Duration) -> PerformanceReport {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(window).unwrap_or_else(|_| ChronoDuration::seconds(0));

        let executions = self.executions.lock();
        let recent: Vec<&ExecutionTrace> = executions
            .values()
            .filter(|t| t.started_at >= cutoff && t.completed_at.is_some())
            .collect();

        let mut totals: Vec<f64> = recent
            .iter()
            .map(|t| t.total_duration().as_secs_f64() * 1000.0)
            .collect();
        totals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let total = recent.len();
        let successful = recent.iter().filter(|t| t.success == Some(true)).count();
        drop(executions);

        PerformanceReport {
            window_seconds: window.as_secs(),
            total_executions: total,
            successful_executions: successful,
            failed_executions: total - successful,
            avg_total_ms: if totals.is_empty() {
                0.0
            } else {
                totals.iter().sum::<f64>() / totals.len() as f64
            },
            p95_total_ms: if totals.is_empty() {
                0.0
            } else {
                percentile(&totals, 0.95)
            },
            stage_breakdown: PipelineStage::ALL
                .iter()
                .map(|stage| StageBreakdown {
                    stage: stage.to_string(),
                    stats: self.stage_stats(*stage),
                })
                .collect(),
        }
    }

    /// Stages whose mean share of total execution time across completed
    /// executions exceeds the threshold (in [0, 1]). Diagnostic only.
    pub fn detect_bottlenecks(&self, threshold: f64) -> Vec<(PipelineStage, f64)> {
        let executions = self.executions.lock();
        let completed: Vec<&ExecutionTrace> = executions
            .values()
            .filter(|t| t.completed_at.is_some() && !t.stages.is_empty())
            .collect();
        if completed.is_empty() {
            return Vec::new();
        }

        let mut flagged: Vec<(PipelineStage, f64)> = PipelineStage::ALL
            .iter()
            .filter_map(|stage| {
                let mean_share = completed
                    .iter()
                    .map(|t| t.stage_share(*stage))
                    .sum::<f64>()
                    / completed.len() as f64;
                (mean_share > threshold).then_some((*stage, mean_share))
            })
            .collect();
        flagged.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        flagged
    }
}

/// Nearest-rank percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * p).ceil() as usize).saturating_sub(1);
    sorted[index.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_stage(
        tracker: &PipelineTracker,
        execution_id: Uuid,
        stage: PipelineStage,
        busy: Duration,
        success: bool,
    ) {
        let handle = tracker.start_stage(execution_id, stage).unwrap();
        std::thread::sleep(busy);
        tracker.complete_stage(handle, success, 1);
    }

    #[test]
    fn test_execution_total_is_sum_of_stages() {
        let tracker = PipelineTracker::new(100);
        let id = tracker.start_execution("blob/doc.pdf");

        record_stage(&tracker, id, PipelineStage::Validate, Duration::from_millis(5), true);
        record_stage(&tracker, id, PipelineStage::Extract, Duration::from_millis(10), true);

        let trace = tracker.complete_execution(id, true).unwrap();
        assert_eq!(trace.stages.len(), 2);
        let stage_sum: Duration = trace.stages.iter().map(|s| s.duration).sum();
        assert_eq!(trace.total_duration(), stage_sum);
        assert!(trace.total_duration() >= Duration::from_millis(15));
    }

    #[test]
    fn test_unknown_execution_yields_no_handle() {
        let tracker = PipelineTracker::new(100);
        assert!(tracker
            .start_stage(Uuid::new_v4(), PipelineStage::Validate)
            .is_none());
    }

    #[test]
    fn test_stage_stats_counts_failures_separately() {
        let tracker = PipelineTracker::new(100);
        let id = tracker.start_execution("blob/doc.pdf");
        record_stage(&tracker, id, PipelineStage::Extract, Duration::from_millis(1), true);
        record_stage(&tracker, id, PipelineStage::Extract, Duration::from_millis(1), true);
        record_stage(&tracker, id, PipelineStage::Extract, Duration::from_millis(1), false);

        let stats = tracker.stage_stats(PipelineStage::Extract);
        assert_eq!(stats.total_runs, 3);
        assert_eq!(stats.successful_runs, 2);
        assert_eq!(stats.failed_runs, 1);
        assert!((stats.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!(stats.p95_ms >= stats.median_ms);
    }

    #[test]
    fn test_history_is_bounded() {
        let tracker = PipelineTracker::new(3);
        let id = tracker.start_execution("blob/doc.pdf");
        for _ in 0..10 {
            record_stage(&tracker, id, PipelineStage::Persist, Duration::ZERO, true);
        }
        assert_eq!(tracker.stage_stats(PipelineStage::Persist).total_runs, 3);
    }

    #[test]
    fn test_bottleneck_detection_flags_dominant_stage() {
        let tracker = PipelineTracker::new(100);
        let id = tracker.start_execution("blob/doc.pdf");
        record_stage(&tracker, id, PipelineStage::Validate, Duration::from_millis(1), true);
        record_stage(&tracker, id, PipelineStage::Extract, Duration::from_millis(60), true);
        record_stage(&tracker, id, PipelineStage::Classify, Duration::from_millis(1), true);
        tracker.complete_execution(id, true);

        let bottlenecks = tracker.detect_bottlenecks(0.5);
        assert_eq!(bottlenecks.len(), 1);
        assert_eq!(bottlenecks[0].0, PipelineStage::Extract);
        assert!(bottlenecks[0].1 > 0.5);
    }

    #[test]
    fn test_performance_report_window() {
        let tracker = PipelineTracker::new(100);
        let id = tracker.start_execution("blob/doc.pdf");
        record_stage(&tracker, id, PipelineStage::Validate, Duration::from_millis(1), true);
        tracker.complete_execution(id, true);

        let report = tracker.performance_report(Duration::from_secs(3600));
        assert_eq!(report.total_executions, 1);
        assert_eq!(report.successful_executions, 1);
        assert_eq!(report.stage_breakdown.len(), 4);
    }
}
