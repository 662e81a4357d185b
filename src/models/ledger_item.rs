//! Open items from the partner's tax-authority ledger. Read-only to this
//! subsystem; owned by the external ledger service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLedgerItem {
    /// Ledger-assigned reference, unique within the partner's ledger.
    pub item_ref: String,
    pub partner_tax_id: String,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub amount_minor: i64,
    pub currency: String,
}
