//! # Priority Job Queue
//!
//! Strict-priority scheduling: HIGH is always drained before NORMAL before
//! LOW, first-in-first-out within a level. A sustained flood of HIGH jobs
//! can indefinitely delay LOW jobs; that is the accepted trade-off, not a
//! bug.
//!
//! Dequeue is atomic: the QUEUED -> PROCESSING transition happens under
//! the job's entry lock, so exactly one worker may hold a given job in
//! PROCESSING at a time. Recoverable failures are re-queued after a
//! jittered exponential backoff; exhausted or non-recoverable failures are
//! dead-lettered exactly once.

use crate::config::ReconConfig;
use crate::error::{ReconError, Result};
use crate::models::{DeadLetterEntry, DlqAction, Job, JobPriority, JobStatus, QueueStats};
use crate::queue::backoff::retry_delay;
use crate::queue::dead_letter_store::DeadLetterStore;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_jitter: f64,
}

impl From<&ReconConfig> for QueueConfig {
    fn from(config: &ReconConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base_ms: config.backoff_base_ms,
            backoff_max_ms: config.backoff_max_ms,
            backoff_jitter: config.backoff_jitter,
        }
    }
}

/// Ready lists per priority plus jobs waiting out their backoff delay.
/// Ids are promoted from `delayed` to the ready lists lazily on dequeue,
/// so a retrying job never becomes visible before its delay elapses.
#[derive(Default)]
struct ReadyState {
    high: VecDeque<Uuid>,
    normal: VecDeque<Uuid>,
    low: VecDeque<Uuid>,
    delayed: Vec<(Instant, Uuid, JobPriority)>,
}

impl ReadyState {
    fn push_back(&mut self, priority: JobPriority, job_id: Uuid) {
        self.list(priority).push_back(job_id);
    }

    fn push_front(&mut self, priority: JobPriority, job_id: Uuid) {
        self.list(priority).push_front(job_id);
    }

    fn list(&mut self, priority: JobPriority) -> &mut VecDeque<Uuid> {
        match priority {
            JobPriority::High => &mut self.high,
            JobPriority::Normal => &mut self.normal,
            JobPriority::Low => &mut self.low,
        }
    }

    fn pop_next(&mut self) -> Option<Uuid> {
        self.high
            .pop_front()
            .or_else(|| self.normal.pop_front())
            .or_else(|| self.low.pop_front())
    }
}

/// Outcome of resolving a dead-letter entry.
#[derive(Debug, Clone)]
pub struct DlqResolution {
    pub entry: DeadLetterEntry,
    /// Present only for `Retry` resolutions.
    pub new_job_id: Option<Uuid>,
}

pub struct JobQueue {
    jobs: DashMap<Uuid, Job>,
    ready: Mutex<ReadyState>,
    dlq: Arc<DeadLetterStore>,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            jobs: DashMap::new(),
            ready: Mutex::new(ReadyState::default()),
            dlq: Arc::new(DeadLetterStore::new()),
            config,
        }
    }

    pub fn dead_letters(&self) -> &DeadLetterStore {
        &self.dlq
    }

    /// Submit a new job. Returns the job id for tracking.
    pub fn enqueue(
        &self,
        task_id: Uuid,
        payload_ref: impl Into<String>,
        priority: JobPriority,
        tags: HashMap<String, String>,
    ) -> Uuid {
        let job = Job::new(task_id, payload_ref, priority, self.config.max_retries, tags);
        let job_id = job.job_id;
        info!(job_id = %job_id, priority = %priority, "📤 Job enqueued");
        self.jobs.insert(job_id, job);
        self.ready.lock().push_back(priority, job_id);
        job_id
    }

    /// Take the next job, highest priority first. Atomically transitions
    /// the job QUEUED -> PROCESSING; returns `None` when nothing is ready.
    pub fn dequeue(&self) -> Option<Job> {
        let mut ready = self.ready.lock();
        self.promote_due(&mut ready);

        while let Some(job_id) = ready.pop_next() {
            // The id may be stale (job cancelled) or the job may have been
            // grabbed through another path; the compare-and-swap below is
            // what actually hands ownership to the caller.
            let Some(mut job) = self.jobs.get_mut(&job_id) else {
                continue;
            };
            if job.status != JobStatus::Queued {
                debug!(job_id = %job_id, status = %job.status, "Skipping stale ready entry");
                continue;
            }
            job.transition(JobStatus::Processing, None);
            job.started_at = Some(Utc::now());
            return Some(job.clone());
        }
        None
    }

    /// Acknowledge successful completion of a PROCESSING job.
    pub fn ack(&self, job_id: Uuid) -> Result<()> {
        let mut job = self
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| ReconError::processing(format!("Unknown job {job_id}")))?;
        if job.status != JobStatus::Processing {
            return Err(ReconError::processing(format!(
                "Cannot ack job {job_id} in state {}",
                job.status
            )));
        }
        job.transition(JobStatus::Completed, None);
        job.completed_at = Some(Utc::now());
        info!(job_id = %job_id, "✅ Job completed");
        Ok(())
    }

    /// Report a failure for a PROCESSING job. Recoverable failures retry
    /// with backoff until `max_retries`; everything else dead-letters.
    /// Returns the job's resulting status. Duplicate reports for a job
    /// that already left PROCESSING are no-ops.
    pub fn fail(&self, job_id: Uuid, error: &str, recoverable: bool) -> Result<JobStatus> {
        let (snapshot, delay) = {
            let mut job = self
                .jobs
                .get_mut(&job_id)
                .ok_or_else(|| ReconError::processing(format!("Unknown job {job_id}")))?;
            if job.status != JobStatus::Processing {
                warn!(
                    job_id = %job_id,
                    status = %job.status,
                    "Ignoring failure report for job not in PROCESSING"
                );
                return Ok(job.status);
            }

            job.transition(JobStatus::Failed, Some(error.to_string()));

            if recoverable && job.retry_count < job.max_retries {
                job.retry_count += 1;
                job.transition(JobStatus::Retrying, None);
                let delay = retry_delay(
                    self.config.backoff_base_ms,
                    self.config.backoff_max_ms,
                    self.config.backoff_jitter,
                    job.retry_count,
                );
                info!(
                    job_id = %job_id,
                    retry_count = job.retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "🔄 Job scheduled for retry"
                );
                (None, Some((delay, job.priority)))
            } else {
                job.transition(JobStatus::Dlq, None);
                job.completed_at = Some(Utc::now());
                (Some(job.clone()), None)
            }
        };
        // Entry lock released; touch the other stores without holding it.
        if let Some(job) = snapshot {
            self.dlq.create_if_absent(&job, error);
            return Ok(JobStatus::Dlq);
        }
        if let Some((delay, priority)) = delay {
            self.ready
                .lock()
                .delayed
                .push((Instant::now() + delay, job_id, priority));
        }
        Ok(JobStatus::Retrying)
    }

    /// Hand a PROCESSING job back to the front of its priority level
    /// without counting a retry. Used by workers aborting cooperatively
    /// at a stage boundary during shutdown.
    pub fn release(&self, job_id: Uuid) -> Result<()> {
        let priority = {
            let mut job = self
                .jobs
                .get_mut(&job_id)
                .ok_or_else(|| ReconError::processing(format!("Unknown job {job_id}")))?;
            if job.status != JobStatus::Processing {
                return Err(ReconError::processing(format!(
                    "Cannot release job {job_id} in state {}",
                    job.status
                )));
            }
            job.transition(JobStatus::Queued, None);
            job.started_at = None;
            job.priority
        };
        self.ready.lock().push_front(priority, job_id);
        Ok(())
    }

    /// Remove a QUEUED job outright. PROCESSING jobs cannot be forcibly
    /// cancelled; returns false for anything not currently queued.
    pub fn cancel(&self, job_id: Uuid) -> bool {
        let removed = self
            .jobs
            .remove_if(&job_id, |_, job| job.status == JobStatus::Queued)
            .is_some();
        if removed {
            info!(job_id = %job_id, "Queued job cancelled");
        }
        removed
    }

    pub fn job(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.get(&job_id).map(|j| j.clone())
    }

    /// Resolve a dead-letter entry. `Retry` re-queues the payload as a
    /// brand-new job with a fresh id and zeroed retry count, preserving
    /// the original job's history; `Discard` closes the entry. Returns
    /// `None` when the entry is missing or was already resolved, so a
    /// duplicate resolution can never spawn a second retry job.
    pub fn resolve_dead_letter(
        &self,
        dlq_id: Uuid,
        action: DlqAction,
        notes: Option<String>,
    ) -> Option<DlqResolution> {
        let entry = self.dlq.mark_resolved(dlq_id, notes)?;
        let new_job_id = match action {
            DlqAction::Retry => {
                let new_job_id = self.enqueue(
                    entry.task_id,
                    entry.payload_ref.clone(),
                    entry.priority,
                    HashMap::from([("requeued_from".to_string(), dlq_id.to_string())]),
                );
                info!(dlq_id = %dlq_id, new_job_id = %new_job_id, "Dead-letter entry re-queued");
                Some(new_job_id)
            }
            DlqAction::Discard => {
                info!(dlq_id = %dlq_id, "Dead-letter entry discarded");
                None
            }
        };
        Some(DlqResolution { entry, new_job_id })
    }

    /// Per-priority statistics across all known jobs.
    pub fn stats(&self) -> HashMap<JobPriority, QueueStats> {
        let mut stats: HashMap<JobPriority, QueueStats> = HashMap::new();
        for job in self.jobs.iter() {
            let entry = stats.entry(job.priority).or_default();
            entry.total_jobs += 1;
            match job.status {
                JobStatus::Queued => entry.queued += 1,
                JobStatus::Processing => entry.processing += 1,
                JobStatus::Completed => entry.completed += 1,
                JobStatus::Retrying | JobStatus::Failed => entry.retrying += 1,
                JobStatus::Dlq => entry.dead_lettered += 1,
            }
        }
        stats
    }

    /// Move jobs whose backoff delay elapsed back into their ready list.
    fn promote_due(&self, ready: &mut ReadyState) {
        if ready.delayed.is_empty() {
            return;
        }
        let now = Instant::now();
        let delayed = std::mem::take(&mut ready.delayed);
        for (ready_at, job_id, priority) in delayed {
            if ready_at <= now {
                if let Some(mut job) = self.jobs.get_mut(&job_id) {
                    if job.status == JobStatus::Retrying {
                        job.transition(JobStatus::Queued, None);
                        ready.list(priority).push_back(job_id);
                    }
                }
            } else {
                ready.delayed.push((ready_at, job_id, priority));
            }
        }
    }
}
