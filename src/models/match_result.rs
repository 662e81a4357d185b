//! Classification output of the matching engine. Computed fresh on every
//! run and attached to a task snapshot; never persisted as mutable state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Match confidence tier: auto-accept, needs review, no candidate found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Hard match; the task completes automatically.
    Green,
    /// Soft match within tolerance; routed to human review.
    Yellow,
    /// No qualifying candidate; routed to human review.
    Red,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Green => write!(f, "GREEN"),
            Self::Yellow => write!(f, "YELLOW"),
            Self::Red => write!(f, "RED"),
        }
    }
}

/// One soft-match candidate retained for reviewer presentation, ranked by
/// amount difference, then date proximity, then item reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub item_ref: String,
    pub amount_diff_minor: i64,
    pub date_distance_days: i64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub status: MatchStatus,
    /// In [0, 1]. 1.0 for hard matches, 0.0 for no match.
    pub confidence: f64,
    pub matched_item_ref: Option<String>,
    /// All qualifying soft-match candidates in rank order; the top one
    /// also populates `matched_item_ref`. Empty for GREEN and RED.
    #[serde(default)]
    pub alternatives: Vec<RankedCandidate>,
    pub reason: String,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            status: MatchStatus::Red,
            confidence: 0.0,
            matched_item_ref: None,
            alternatives: Vec::new(),
            reason: "no matching open item found".to_string(),
        }
    }
}
