//! # Dead-Letter Store
//!
//! Holding area for jobs that exhausted retries or failed non-recoverably.
//! Entry creation is an atomic conditional insert keyed by the original
//! job id, so two racing failure reports cannot create duplicates.

use crate::models::{DeadLetterEntry, DlqStatus, Job};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Default)]
pub struct DeadLetterStore {
    entries: DashMap<Uuid, DeadLetterEntry>,
    /// original_job_id -> dlq_id; the dedup index. Holding this entry's
    /// shard lock is what serializes racing create attempts.
    by_job: DashMap<Uuid, Uuid>,
}

impl DeadLetterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entry for a dead-lettered job, exactly once per
    /// `original_job_id`. Returns the dlq id either way.
    pub fn create_if_absent(&self, job: &Job, error: &str) -> Uuid {
        match self.by_job.entry(job.job_id) {
            Entry::Occupied(existing) => {
                warn!(
                    job_id = %job.job_id,
                    dlq_id = %existing.get(),
                    "Duplicate dead-letter report ignored"
                );
                *existing.get()
            }
            Entry::Vacant(slot) => {
                let entry = DeadLetterEntry {
                    dlq_id: Uuid::new_v4(),
                    original_job_id: job.job_id,
                    task_id: job.task_id,
                    payload_ref: job.payload_ref.clone(),
                    priority: job.priority,
                    error: error.to_string(),
                    retry_count: job.retry_count,
                    status: DlqStatus::PendingReview,
                    resolution_notes: None,
                    created_at: Utc::now(),
                    resolved_at: None,
                };
                let dlq_id = entry.dlq_id;
                info!(
                    job_id = %job.job_id,
                    dlq_id = %dlq_id,
                    error = %error,
                    "📛 Job dead-lettered"
                );
                self.entries.insert(dlq_id, entry);
                slot.insert(dlq_id);
                dlq_id
            }
        }
    }

    pub fn get(&self, dlq_id: Uuid) -> Option<DeadLetterEntry> {
        self.entries.get(&dlq_id).map(|e| e.clone())
    }

    /// Entries newest-first, optionally filtered by status.
    pub fn list(&self, status: Option<DlqStatus>) -> Vec<DeadLetterEntry> {
        let mut items: Vec<DeadLetterEntry> = self
            .entries
            .iter()
            .filter(|e| status.is_none_or(|s| e.status == s))
            .map(|e| e.clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    /// Atomically flip PENDING_REVIEW -> RESOLVED, returning the resolved
    /// entry. A second resolution call for the same entry observes the
    /// RESOLVED status and becomes a no-op.
    pub fn mark_resolved(&self, dlq_id: Uuid, notes: Option<String>) -> Option<DeadLetterEntry> {
        let mut entry = self.entries.get_mut(&dlq_id)?;
        if entry.status != DlqStatus::PendingReview {
            warn!(dlq_id = %dlq_id, "Dead-letter entry already resolved");
            return None;
        }
        entry.status = DlqStatus::Resolved;
        entry.resolution_notes = notes;
        entry.resolved_at = Some(Utc::now());
        info!(dlq_id = %dlq_id, "Dead-letter entry resolved");
        Some(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobPriority;
    use std::collections::HashMap;

    fn job() -> Job {
        Job::new(
            Uuid::new_v4(),
            "blob/doc.pdf",
            JobPriority::Normal,
            3,
            HashMap::new(),
        )
    }

    #[test]
    fn test_create_is_idempotent_per_job() {
        let store = DeadLetterStore::new();
        let job = job();
        let first = store.create_if_absent(&job, "analyzer down");
        let second = store.create_if_absent(&job, "analyzer still down");
        assert_eq!(first, second);
        assert_eq!(store.list(None).len(), 1);
        // The first report's error is the one retained.
        assert_eq!(store.get(first).unwrap().error, "analyzer down");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let store = DeadLetterStore::new();
        let dlq_id = store.create_if_absent(&job(), "boom");

        let first = store.mark_resolved(dlq_id, Some("requeued".to_string()));
        assert!(first.is_some());
        let second = store.mark_resolved(dlq_id, Some("again".to_string()));
        assert!(second.is_none());

        let entry = store.get(dlq_id).unwrap();
        assert_eq!(entry.status, DlqStatus::Resolved);
        assert_eq!(entry.resolution_notes.as_deref(), Some("requeued"));
    }

    #[test]
    fn test_list_filters_by_status() {
        let store = DeadLetterStore::new();
        let resolved = store.create_if_absent(&job(), "a");
        store.create_if_absent(&job(), "b");
        store.mark_resolved(resolved, None);

        assert_eq!(store.list(Some(DlqStatus::PendingReview)).len(), 1);
        assert_eq!(store.list(Some(DlqStatus::Resolved)).len(), 1);
        assert_eq!(store.list(None).len(), 2);
    }
}
