//! # Matching Engine
//!
//! Pure, deterministic classification of an extracted invoice header
//! against the partner's open ledger items. Rules are evaluated in a
//! fixed order and the first qualifying rule wins:
//!
//! 1. Hard match — exact tax id and amount, plus invoice number or date
//!    equality → GREEN, auto-completed.
//! 2. Soft match — exact tax id with the amount inside a configured
//!    tolerance or the invoice number within a small edit distance →
//!    YELLOW, routed to review with ranked alternatives.
//! 3. Otherwise → RED. RED is an expected business outcome, never an
//!    error; the engine only errors on malformed input.
//!
//! Stateless and safe for unbounded concurrent invocation.

use crate::config::MatchingConfig;
use crate::error::{ReconError, Result};
use crate::models::{ExtractedHeader, MatchResult, MatchStatus, OpenLedgerItem, RankedCandidate};
use tracing::debug;

pub struct MatchingEngine {
    config: MatchingConfig,
}

impl MatchingEngine {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Classify a header against candidate ledger items.
    ///
    /// Returns a validation error for malformed input (missing tax id,
    /// non-positive amount); a header that simply matches nothing yields
    /// `MatchStatus::Red`.
    pub fn classify(
        &self,
        header: &ExtractedHeader,
        candidates: &[OpenLedgerItem],
    ) -> Result<MatchResult> {
        if header.partner_tax_id.trim().is_empty() {
            return Err(ReconError::validation(
                "partner_tax_id",
                "must not be empty",
            ));
        }
        if header.gross_amount_minor <= 0 {
            return Err(ReconError::validation(
                "gross_amount_minor",
                "must be positive",
            ));
        }

        if let Some(result) = self.hard_match(header, candidates) {
            return Ok(result);
        }
        if let Some(result) = self.soft_match(header, candidates) {
            return Ok(result);
        }

        debug!(
            tax_id = %header.partner_tax_id,
            invoice_number = %header.invoice_number,
            candidates = candidates.len(),
            "No qualifying ledger item"
        );
        Ok(MatchResult::no_match())
    }

    /// Rule 1: tax id and amount equal, plus invoice number or date
    /// equality. Ties break on closest date, then lowest item reference,
    /// so repeated runs pick the same candidate.
    fn hard_match(
        &self,
        header: &ExtractedHeader,
        candidates: &[OpenLedgerItem],
    ) -> Option<MatchResult> {
        let mut qualifying: Vec<&OpenLedgerItem> = candidates
            .iter()
            .filter(|item| {
                item.partner_tax_id == header.partner_tax_id
                    && item.amount_minor == header.gross_amount_minor
                    && (same_invoice_number(header, item)
                        || item.issue_date == header.issue_date)
            })
            .collect();
        if qualifying.is_empty() {
            return None;
        }

        qualifying.sort_by(|a, b| {
            date_distance_days(header, a)
                .cmp(&date_distance_days(header, b))
                .then_with(|| a.item_ref.cmp(&b.item_ref))
        });
        let best = qualifying[0];

        Some(MatchResult {
            status: MatchStatus::Green,
            confidence: 1.0,
            matched_item_ref: Some(best.item_ref.clone()),
            alternatives: Vec::new(),
            reason: "exact match on tax id and amount".to_string(),
        })
    }

    /// Rule 2: tax id equal, and either the amount difference is within
    /// tolerance or the invoice number is within the edit-distance
    /// threshold. All qualifiers are retained as ranked alternatives for
    /// the reviewer; the top-ranked one populates `matched_item_ref`.
    fn soft_match(
        &self,
        header: &ExtractedHeader,
        candidates: &[OpenLedgerItem],
    ) -> Option<MatchResult> {
        let tolerance = self.config.amount_tolerance_minor;
        let max_distance = self.config.invoice_number_max_distance;

        let mut ranked: Vec<RankedCandidate> = candidates
            .iter()
            .filter(|item| item.partner_tax_id == header.partner_tax_id)
            .filter_map(|item| {
                let amount_diff = (item.amount_minor - header.gross_amount_minor).abs();
                let within_amount = amount_diff <= tolerance;

                let edit_distance = invoice_number_distance(header, item);
                let within_number = edit_distance.is_some_and(|d| d <= max_distance);

                if !within_amount && !within_number {
                    return None;
                }

                // Confidence scales inversely with how far the candidate
                // is from an exact match on the qualifying dimension.
                let amount_norm = amount_diff as f64 / (tolerance + 1) as f64;
                let number_norm = edit_distance
                    .map(|d| d as f64 / (max_distance + 1) as f64)
                    .unwrap_or(1.0);
                let norm = match (within_amount, within_number) {
                    (true, true) => amount_norm.min(number_norm),
                    (true, false) => amount_norm,
                    (false, true) => number_norm,
                    (false, false) => unreachable!(),
                };

                Some(RankedCandidate {
                    item_ref: item.item_ref.clone(),
                    amount_diff_minor: amount_diff,
                    date_distance_days: date_distance_days(header, item),
                    confidence: (1.0 - norm).clamp(0.0, 1.0),
                })
            })
            .collect();
        if ranked.is_empty() {
            return None;
        }

        ranked.sort_by(|a, b| {
            a.amount_diff_minor
                .cmp(&b.amount_diff_minor)
                .then_with(|| a.date_distance_days.cmp(&b.date_distance_days))
                .then_with(|| a.item_ref.cmp(&b.item_ref))
        });
        let best = &ranked[0];

        Some(MatchResult {
            status: MatchStatus::Yellow,
            confidence: best.confidence,
            matched_item_ref: Some(best.item_ref.clone()),
            reason: if best.amount_diff_minor <= tolerance {
                "amount mismatch within tolerance".to_string()
            } else {
                "invoice number within edit distance".to_string()
            },
            alternatives: ranked,
        })
    }
}

/// Invoice-number equality only counts when both sides are present.
fn same_invoice_number(header: &ExtractedHeader, item: &OpenLedgerItem) -> bool {
    !header.invoice_number.is_empty()
        && !item.invoice_number.is_empty()
        && header.invoice_number == item.invoice_number
}

fn invoice_number_distance(header: &ExtractedHeader, item: &OpenLedgerItem) -> Option<usize> {
    if header.invoice_number.is_empty() || item.invoice_number.is_empty() {
        return None;
    }
    Some(strsim::levenshtein(
        &header.invoice_number,
        &item.invoice_number,
    ))
}

fn date_distance_days(header: &ExtractedHeader, item: &OpenLedgerItem) -> i64 {
    (item.issue_date - header.issue_date).num_days().abs()
}
