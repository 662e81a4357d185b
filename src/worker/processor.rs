//! Per-job pipeline execution: VALIDATE -> EXTRACT -> CLASSIFY -> PERSIST,
//! each stage bracketed by the pipeline tracker. The processor owns no
//! locks across collaborator calls; all shared state goes through the
//! atomic store operations.

use crate::error::{ReconError, Result};
use crate::matching::MatchingEngine;
use crate::models::{Job, MatchResult, MatchStatus, Task, TaskLifecycle};
use crate::services::{DocumentAnalyzer, LedgerClient, ObjectStore};
use crate::store::{TaskPatch, TaskStore, TaskUpdateError};
use crate::tracker::{PipelineStage, PipelineTracker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// How processing one job ended, from the queue's point of view.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Pipeline ran to completion; the task is COMPLETED or
    /// PENDING_REVIEW.
    Finished {
        task_id: Uuid,
        status: MatchStatus,
    },
    /// The task had already been finalized (earlier attempt or reviewer
    /// decision); nothing left to do.
    AlreadyFinalized { task_id: Uuid },
    /// Cooperative abort at a stage boundary during shutdown; the job
    /// goes back to the queue untouched.
    Aborted,
}

pub struct DocumentProcessor {
    engine: MatchingEngine,
    tracker: Arc<PipelineTracker>,
    tasks: Arc<TaskStore>,
    objects: Arc<dyn ObjectStore>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    ledger: Arc<dyn LedgerClient>,
    extraction_timeout: Duration,
}

impl DocumentProcessor {
    pub fn new(
        engine: MatchingEngine,
        tracker: Arc<PipelineTracker>,
        tasks: Arc<TaskStore>,
        objects: Arc<dyn ObjectStore>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        ledger: Arc<dyn LedgerClient>,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            tracker,
            tasks,
            objects,
            analyzer,
            ledger,
            extraction_timeout,
        }
    }

    /// Run the full pipeline for one dequeued job. The cancellation flag
    /// is checked only at stage boundaries; a started stage always
    /// finishes cleanly.
    pub async fn process(&self, job: &Job, cancelled: &AtomicBool) -> Result<ProcessOutcome> {
        let execution_id = self.tracker.start_execution(&job.payload_ref);

        // VALIDATE
        let handle = self.stage_handle(execution_id, PipelineStage::Validate)?;
        let task = match self.validate(job) {
            Ok(Some(task)) => {
                self.tracker.complete_stage(handle, true, 1);
                task
            }
            Ok(None) => {
                self.tracker.complete_stage(handle, true, 1);
                self.tracker.complete_execution(execution_id, true);
                return Ok(ProcessOutcome::AlreadyFinalized {
                    task_id: job.task_id,
                });
            }
            Err(error) => {
                self.tracker.complete_stage(handle, false, 0);
                self.tracker.complete_execution(execution_id, false);
                return Err(error);
            }
        };

        if cancelled.load(Ordering::Acquire) {
            self.tracker.complete_execution(execution_id, false);
            return Ok(ProcessOutcome::Aborted);
        }

        // EXTRACT
        let handle = self.stage_handle(execution_id, PipelineStage::Extract)?;
        let (header, task) = match self.extract(job, &task).await {
            Ok(value) => {
                self.tracker.complete_stage(handle, true, 1);
                value
            }
            Err(error) => {
                self.tracker.complete_stage(handle, false, 0);
                self.tracker.complete_execution(execution_id, false);
                return Err(error);
            }
        };

        if cancelled.load(Ordering::Acquire) {
            self.tracker.complete_execution(execution_id, false);
            return Ok(ProcessOutcome::Aborted);
        }

        // CLASSIFY
        let handle = self.stage_handle(execution_id, PipelineStage::Classify)?;
        let match_result = match self.classify(&header).await {
            Ok(result) => {
                self.tracker
                    .complete_stage(handle, true, result.alternatives.len().max(1) as u64);
                result
            }
            Err(error) => {
                self.tracker.complete_stage(handle, false, 0);
                self.tracker.complete_execution(execution_id, false);
                return Err(error);
            }
        };

        if cancelled.load(Ordering::Acquire) {
            self.tracker.complete_execution(execution_id, false);
            return Ok(ProcessOutcome::Aborted);
        }

        // PERSIST
        let handle = self.stage_handle(execution_id, PipelineStage::Persist)?;
        let status = match_result.status;
        match self.persist(&task, match_result) {
            Ok(()) => self.tracker.complete_stage(handle, true, 1),
            Err(error) => {
                self.tracker.complete_stage(handle, false, 0);
                self.tracker.complete_execution(execution_id, false);
                return Err(error);
            }
        }

        self.tracker.complete_execution(execution_id, true);
        info!(
            job_id = %job.job_id,
            task_id = %job.task_id,
            status = %status,
            "Reconciliation finished"
        );
        Ok(ProcessOutcome::Finished {
            task_id: job.task_id,
            status,
        })
    }

    /// Check the payload and move the task into EXTRACTING. Returns
    /// `None` when the task was already finalized elsewhere.
    fn validate(&self, job: &Job) -> Result<Option<Task>> {
        if job.payload_ref.trim().is_empty() {
            return Err(ReconError::validation("payload_ref", "must not be empty"));
        }
        let task = self.tasks.get(job.task_id).ok_or_else(|| {
            ReconError::validation("task_id", format!("unknown task {}", job.task_id))
        })?;
        if task.lifecycle_state.is_terminal()
            || task.lifecycle_state == TaskLifecycle::PendingReview
        {
            warn!(
                job_id = %job.job_id,
                task_id = %task.task_id,
                state = %task.lifecycle_state,
                "Task already finalized; skipping"
            );
            return Ok(None);
        }
        Ok(Some(self.advance_task(
            job.task_id,
            TaskLifecycle::Extracting,
            TaskPatch::default(),
        )?))
    }

    /// Fetch the document and extract its header, bounded by the
    /// extraction timeout. A timeout is a recoverable external failure,
    /// routed through the retry path rather than stalling the queue.
    async fn extract(&self, job: &Job, task: &Task) -> Result<(crate::models::ExtractedHeader, Task)> {
        let extraction = async {
            let bytes = self.objects.fetch_object(&job.payload_ref).await?;
            self.analyzer.analyze(&bytes).await
        };
        let header = tokio::time::timeout(self.extraction_timeout, extraction)
            .await
            .map_err(|_| {
                ReconError::external(
                    "document-analyzer",
                    format!(
                        "extraction exceeded {}ms for {}",
                        self.extraction_timeout.as_millis(),
                        job.payload_ref
                    ),
                )
            })??;

        let task = self.advance_task(
            task.task_id,
            TaskLifecycle::Matching,
            TaskPatch {
                extracted_header: Some(header.clone()),
                ..TaskPatch::default()
            },
        )?;
        Ok((header, task))
    }

    async fn classify(&self, header: &crate::models::ExtractedHeader) -> Result<MatchResult> {
        let candidates = self.ledger.query_open_items(&header.partner_tax_id).await?;
        self.engine.classify(header, &candidates)
    }

    /// GREEN completes automatically; YELLOW and RED go to human review.
    fn persist(&self, task: &Task, match_result: MatchResult) -> Result<()> {
        let target = match match_result.status {
            MatchStatus::Green => TaskLifecycle::Completed,
            MatchStatus::Yellow | MatchStatus::Red => TaskLifecycle::PendingReview,
        };
        self.advance_task(
            task.task_id,
            target,
            TaskPatch {
                match_result: Some(match_result),
                ..TaskPatch::default()
            },
        )?;
        Ok(())
    }

    fn stage_handle(
        &self,
        execution_id: Uuid,
        stage: PipelineStage,
    ) -> Result<crate::tracker::StageHandle> {
        self.tracker
            .start_stage(execution_id, stage)
            .ok_or_else(|| ReconError::processing(format!("lost execution {execution_id}")))
    }

    /// Conditional-update loop for automated transitions. A retrying
    /// worker may find the task already at (or past) the target state
    /// from an earlier attempt; that is fine. A version conflict means
    /// someone else wrote concurrently: re-read and re-decide.
    fn advance_task(
        &self,
        task_id: Uuid,
        target: TaskLifecycle,
        mut patch: TaskPatch,
    ) -> Result<Task> {
        for _ in 0..4 {
            let task = self
                .tasks
                .get(task_id)
                .ok_or_else(|| ReconError::processing(format!("task {task_id} disappeared")))?;

            let state_patch = if task.lifecycle_state == target
                || already_past(task.lifecycle_state, target)
            {
                None
            } else if task.lifecycle_state.can_transition_to(target) {
                Some(target)
            } else {
                return Err(ReconError::processing(format!(
                    "task {task_id} cannot move {} -> {}",
                    task.lifecycle_state, target
                )));
            };

            patch.lifecycle_state = state_patch;
            match self.tasks.update(task_id, task.version, patch.clone()) {
                Ok(updated) => return Ok(updated),
                Err(TaskUpdateError::VersionConflict { .. }) => continue,
                Err(error) => return Err(ReconError::processing(error.to_string())),
            }
        }
        Err(ReconError::processing(format!(
            "task {task_id} kept changing under us"
        )))
    }
}

/// Whether the automated pipeline has already carried the task beyond
/// `target` (e.g. a retried job re-validating a task that is already
/// MATCHING).
fn already_past(current: TaskLifecycle, target: TaskLifecycle) -> bool {
    automated_rank(current)
        .zip(automated_rank(target))
        .is_some_and(|(c, t)| c > t)
}

fn automated_rank(state: TaskLifecycle) -> Option<u8> {
    match state {
        TaskLifecycle::Uploaded => Some(0),
        TaskLifecycle::Extracting => Some(1),
        TaskLifecycle::Matching => Some(2),
        _ => None,
    }
}
