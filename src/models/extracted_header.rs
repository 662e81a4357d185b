//! Invoice header fields produced by the document-analysis collaborator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Immutable header extracted once per document. All amounts are minor
/// currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedHeader {
    pub partner_tax_id: String,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub currency: String,
    pub net_amount_minor: i64,
    pub gross_amount_minor: i64,
    #[serde(default)]
    pub reverse_charge: bool,
    #[serde(default)]
    pub cash_accounting: bool,
}
