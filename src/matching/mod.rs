//! Rule-based invoice/ledger matching.

pub mod engine;

pub use engine::MatchingEngine;
