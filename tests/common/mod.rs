//! Shared fixtures: a fully wired in-process stack with fixture
//! collaborators, plus builders for headers and ledger items.

#![allow(dead_code)]

use chrono::NaiveDate;
use recon_core::config::{BreakerConfig, MatchingConfig};
use recon_core::matching::MatchingEngine;
use recon_core::models::{ExtractedHeader, OpenLedgerItem};
use recon_core::queue::{JobQueue, QueueConfig};
use recon_core::services::fixtures::{InMemoryObjectStore, JsonHeaderAnalyzer, StaticLedger};
use recon_core::services::{GuardedAnalyzer, GuardedLedger};
use recon_core::store::TaskStore;
use recon_core::tracker::PipelineTracker;
use recon_core::worker::{DocumentProcessor, WorkerPool};
use std::sync::Arc;
use std::time::Duration;

pub struct TestStack {
    pub queue: Arc<JobQueue>,
    pub tasks: Arc<TaskStore>,
    pub tracker: Arc<PipelineTracker>,
    pub objects: Arc<InMemoryObjectStore>,
    pub pool: WorkerPool,
}

impl TestStack {
    /// Two workers, fast backoff, fixture collaborators seeded with the
    /// given open items.
    pub fn start(open_items: Vec<OpenLedgerItem>) -> Self {
        let queue = Arc::new(JobQueue::new(QueueConfig {
            max_retries: 2,
            backoff_base_ms: 5,
            backoff_max_ms: 50,
            backoff_jitter: 0.0,
        }));
        let tasks = Arc::new(TaskStore::new());
        let tracker = Arc::new(PipelineTracker::new(1_000));
        let objects = Arc::new(InMemoryObjectStore::new());

        let breaker = BreakerConfig {
            failure_threshold: 10,
            cooldown_ms: 60_000,
        };
        let analyzer = Arc::new(GuardedAnalyzer::new(
            Arc::new(JsonHeaderAnalyzer::default()),
            &breaker,
        ));
        let ledger = Arc::new(GuardedLedger::new(
            Arc::new(StaticLedger::new(open_items)),
            &breaker,
        ));
        let processor = Arc::new(DocumentProcessor::new(
            MatchingEngine::new(MatchingConfig::default()),
            Arc::clone(&tracker),
            Arc::clone(&tasks),
            Arc::clone(&objects) as Arc<dyn recon_core::services::ObjectStore>,
            analyzer,
            ledger,
            Duration::from_secs(5),
        ));
        let pool = WorkerPool::new(
            Arc::clone(&queue),
            processor,
            2,
            Duration::from_millis(5),
        );
        pool.start();

        Self {
            queue,
            tasks,
            tracker,
            objects,
            pool,
        }
    }

    /// Store a header document and return its payload reference.
    pub fn put_document(&self, payload_ref: &str, header: &ExtractedHeader) {
        let bytes = serde_json::to_vec(header).expect("header serializes");
        self.objects.put(payload_ref, bytes);
    }
}

pub fn header(tax_id: &str, invoice_number: &str, gross_minor: i64) -> ExtractedHeader {
    ExtractedHeader {
        partner_tax_id: tax_id.to_string(),
        invoice_number: invoice_number.to_string(),
        issue_date: date(2025, 11, 1),
        currency: "EUR".to_string(),
        net_amount_minor: gross_minor - gross_minor / 5,
        gross_amount_minor: gross_minor,
        reverse_charge: false,
        cash_accounting: false,
    }
}

pub fn open_item(item_ref: &str, tax_id: &str, invoice_number: &str, amount_minor: i64) -> OpenLedgerItem {
    OpenLedgerItem {
        item_ref: item_ref.to_string(),
        partner_tax_id: tax_id.to_string(),
        invoice_number: invoice_number.to_string(),
        issue_date: date(2025, 11, 1),
        amount_minor,
        currency: "EUR".to_string(),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Poll `check` every few milliseconds until it returns `Some`, panicking
/// after `timeout`.
pub async fn wait_until<T>(
    timeout: Duration,
    what: &str,
    mut check: impl FnMut() -> Option<T>,
) -> T {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(value) = check() {
            return value;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
