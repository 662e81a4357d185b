//! In-process collaborator implementations for local runs and tests.
//!
//! The fixture analyzer treats the stored document as a JSON-encoded
//! header, standing in for the real OCR service; the fixture ledger is
//! seeded with open items up front. Production deployments replace all
//! three with real service clients.

use crate::error::{ReconError, Result};
use crate::models::{ExtractedHeader, OpenLedgerItem};
use crate::services::{DocumentAnalyzer, LedgerClient, ObjectStore};
use async_trait::async_trait;
use dashmap::DashMap;

/// Keyed in-memory blob store.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, payload_ref: impl Into<String>, bytes: Vec<u8>) {
        self.objects.insert(payload_ref.into(), bytes);
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn fetch_object(&self, payload_ref: &str) -> Result<Vec<u8>> {
        self.objects
            .get(payload_ref)
            .map(|bytes| bytes.clone())
            .ok_or_else(|| ReconError::external("object-store", format!("No object at {payload_ref}")))
    }
}

/// Parses the document bytes as a JSON header. Malformed documents are a
/// validation failure, mirroring how unreadable scans fail extraction.
#[derive(Default)]
pub struct JsonHeaderAnalyzer;

#[async_trait]
impl DocumentAnalyzer for JsonHeaderAnalyzer {
    async fn analyze(&self, bytes: &[u8]) -> Result<ExtractedHeader> {
        serde_json::from_slice(bytes)
            .map_err(|e| ReconError::validation("document", format!("Unparseable header: {e}")))
    }
}

/// Ledger seeded with a fixed set of open items.
#[derive(Default)]
pub struct StaticLedger {
    items: Vec<OpenLedgerItem>,
}

impl StaticLedger {
    pub fn new(items: Vec<OpenLedgerItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl LedgerClient for StaticLedger {
    async fn query_open_items(&self, tax_id: &str) -> Result<Vec<OpenLedgerItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.partner_tax_id == tax_id)
            .cloned()
            .collect())
    }
}
