//! Reconciliation service entry point: wires the queue, task store,
//! tracker, worker pool, and HTTP surface together and runs until
//! interrupted.
//!
//! Collaborators are the in-process fixtures; a deployment against real
//! object storage, a real analyzer, and a real ledger swaps them at this
//! boundary and touches nothing else.

use anyhow::Context;
use chrono::NaiveDate;
use recon_core::config::ReconConfig;
use recon_core::logging::init_structured_logging;
use recon_core::matching::MatchingEngine;
use recon_core::models::OpenLedgerItem;
use recon_core::queue::{JobQueue, QueueConfig};
use recon_core::services::fixtures::{InMemoryObjectStore, JsonHeaderAnalyzer, StaticLedger};
use recon_core::services::{GuardedAnalyzer, GuardedLedger};
use recon_core::store::TaskStore;
use recon_core::tracker::PipelineTracker;
use recon_core::web::{self, state::AppState};
use recon_core::worker::{DocumentProcessor, WorkerPool};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();
    let config = ReconConfig::from_env().context("loading configuration")?;
    info!(
        workers = config.worker_count,
        bind = %config.bind_address,
        "🚀 Starting reconciliation service"
    );

    let queue = Arc::new(JobQueue::new(QueueConfig::from(&config)));
    let tasks = Arc::new(TaskStore::new());
    let tracker = Arc::new(PipelineTracker::new(config.tracker_history_limit));

    let objects = Arc::new(InMemoryObjectStore::new());
    let analyzer = Arc::new(GuardedAnalyzer::new(
        Arc::new(JsonHeaderAnalyzer::default()),
        &config.breaker,
    ));
    let ledger = Arc::new(GuardedLedger::new(
        Arc::new(StaticLedger::new(seed_open_items())),
        &config.breaker,
    ));

    let processor = Arc::new(DocumentProcessor::new(
        MatchingEngine::new(config.matching.clone()),
        Arc::clone(&tracker),
        Arc::clone(&tasks),
        objects,
        analyzer,
        ledger,
        config.extraction_timeout(),
    ));

    let pool = Arc::new(WorkerPool::new(
        Arc::clone(&queue),
        processor,
        config.worker_count,
        config.idle_poll(),
    ));
    pool.start();

    let app = web::router(AppState {
        queue,
        tasks,
        tracker,
    });
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;
    info!(bind = %config.bind_address, "🌐 HTTP surface listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Shutting down worker pool");
    pool.shutdown().await;
    info!("👋 Reconciliation service stopped");
    Ok(())
}

async fn shutdown_signal() {
    // SIGINT is enough for local runs; orchestrators send SIGTERM.
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("installing SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
    info!("🛑 Shutdown signal received");
}

/// Demo ledger contents so a freshly started service can classify the
/// bundled sample documents.
fn seed_open_items() -> Vec<OpenLedgerItem> {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
    vec![
        OpenLedgerItem {
            item_ref: "LED-101".into(),
            partner_tax_id: "12345678".into(),
            invoice_number: "INV-888".into(),
            issue_date: date(2025, 11, 1),
            amount_minor: 14_200,
            currency: "EUR".into(),
        },
        OpenLedgerItem {
            item_ref: "LED-102".into(),
            partner_tax_id: "12345678".into(),
            invoice_number: "INV-901".into(),
            issue_date: date(2025, 11, 15),
            amount_minor: 88_050,
            currency: "EUR".into(),
        },
        OpenLedgerItem {
            item_ref: "LED-201".into(),
            partner_tax_id: "87654321".into(),
            invoice_number: "2025/0042".into(),
            issue_date: date(2025, 10, 20),
            amount_minor: 250_000,
            currency: "EUR".into(),
        },
    ]
}
