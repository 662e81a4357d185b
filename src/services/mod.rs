//! # External Collaborators
//!
//! The pipeline consumes three external services: object storage for
//! document bytes, a document-analysis service for header extraction, and
//! the partner ledger for open items. Each is an injected trait object —
//! components receive their collaborators through constructors, never
//! through process-wide singletons.

pub mod fixtures;
pub mod guarded;

use crate::error::Result;
use crate::models::{ExtractedHeader, OpenLedgerItem};
use async_trait::async_trait;

/// Object storage holding the ingested documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch_object(&self, payload_ref: &str) -> Result<Vec<u8>>;
}

/// OCR/document-analysis service producing header fields. May be slow or
/// unavailable; callers wrap it with a circuit breaker and a timeout.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, bytes: &[u8]) -> Result<ExtractedHeader>;
}

/// The partner's ledger of open tax-authority items. Read-only.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn query_open_items(&self, tax_id: &str) -> Result<Vec<OpenLedgerItem>>;
}

pub use guarded::{GuardedAnalyzer, GuardedLedger};
