//! Fixed-size pool of async workers draining the job queue.
//!
//! Each worker is a plain tokio task running a dequeue/process/settle
//! loop. Shutdown is cooperative: workers observe the flag between jobs
//! and at stage boundaries, and an in-flight job interrupted by shutdown
//! is released back to the queue rather than failed.

use crate::error::ReconError;
use crate::queue::JobQueue;
use crate::worker::processor::{DocumentProcessor, ProcessOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct WorkerPool {
    queue: Arc<JobQueue>,
    processor: Arc<DocumentProcessor>,
    worker_count: usize,
    idle_poll: Duration,
    shutdown: Arc<AtomicBool>,
    handles: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<JobQueue>,
        processor: Arc<DocumentProcessor>,
        worker_count: usize,
        idle_poll: Duration,
    ) -> Self {
        Self {
            queue,
            processor,
            worker_count: worker_count.max(1),
            idle_poll,
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Spawn the workers. Idempotent only in the sense that calling it
    /// twice spawns a second set; callers start the pool once.
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        for worker_id in 0..self.worker_count {
            let queue = Arc::clone(&self.queue);
            let processor = Arc::clone(&self.processor);
            let shutdown = Arc::clone(&self.shutdown);
            let idle_poll = self.idle_poll;
            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, queue, processor, shutdown, idle_poll).await;
            }));
        }
        info!(worker_count = self.worker_count, "👥 Worker pool started");
    }

    /// Signal shutdown and wait for every worker to finish its current
    /// job and exit.
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        let handles = std::mem::take(&mut *self.handles.lock());
        for result in futures::future::join_all(handles).await {
            if let Err(join_error) = result {
                error!(error = %join_error, "Worker task panicked during shutdown");
            }
        }
        info!("👥 Worker pool stopped");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<JobQueue>,
    processor: Arc<DocumentProcessor>,
    shutdown: Arc<AtomicBool>,
    idle_poll: Duration,
) {
    info!(worker_id, "Worker started");
    while !shutdown.load(Ordering::Acquire) {
        let Some(job) = queue.dequeue() else {
            tokio::time::sleep(idle_poll).await;
            continue;
        };
        let job_id = job.job_id;

        match processor.process(&job, &shutdown).await {
            Ok(ProcessOutcome::Finished { task_id, status }) => {
                if let Err(error) = queue.ack(job_id) {
                    warn!(worker_id, %job_id, %error, "Ack failed after completion");
                } else {
                    info!(worker_id, %job_id, %task_id, %status, "✅ Job completed");
                }
            }
            Ok(ProcessOutcome::AlreadyFinalized { task_id }) => {
                let _ = queue.ack(job_id);
                info!(worker_id, %job_id, %task_id, "Job acknowledged without work");
            }
            Ok(ProcessOutcome::Aborted) => {
                if let Err(error) = queue.release(job_id) {
                    warn!(worker_id, %job_id, %error, "Release failed during shutdown");
                }
            }
            Err(error) => {
                let recoverable = error.recoverable();
                settle_failure(&queue, job_id, &error, recoverable, worker_id);
            }
        }
    }
    info!(worker_id, "Worker stopped");
}

fn settle_failure(
    queue: &JobQueue,
    job_id: uuid::Uuid,
    error: &ReconError,
    recoverable: bool,
    worker_id: usize,
) {
    match queue.fail(job_id, &error.to_string(), recoverable) {
        Ok(status) => {
            warn!(
                worker_id,
                %job_id,
                %error,
                recoverable,
                ?status,
                "🔴 Job failed"
            );
        }
        Err(settle_error) => {
            error!(worker_id, %job_id, %settle_error, "Failed to settle failed job");
        }
    }
}
