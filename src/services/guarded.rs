//! Circuit-breaker-wrapped collaborators. One breaker per collaborator:
//! a failing analyzer must not trip calls to the ledger.

use crate::config::BreakerConfig;
use crate::error::Result;
use crate::models::{ExtractedHeader, OpenLedgerItem};
use crate::resilience::CircuitBreaker;
use crate::services::{DocumentAnalyzer, LedgerClient};
use async_trait::async_trait;
use std::sync::Arc;

pub struct GuardedAnalyzer {
    inner: Arc<dyn DocumentAnalyzer>,
    breaker: CircuitBreaker,
}

impl GuardedAnalyzer {
    pub fn new(inner: Arc<dyn DocumentAnalyzer>, config: &BreakerConfig) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new("document-analyzer", config),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[async_trait]
impl DocumentAnalyzer for GuardedAnalyzer {
    async fn analyze(&self, bytes: &[u8]) -> Result<ExtractedHeader> {
        self.breaker.call(|| self.inner.analyze(bytes)).await
    }
}

pub struct GuardedLedger {
    inner: Arc<dyn LedgerClient>,
    breaker: CircuitBreaker,
}

impl GuardedLedger {
    pub fn new(inner: Arc<dyn LedgerClient>, config: &BreakerConfig) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new("ledger", config),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[async_trait]
impl LedgerClient for GuardedLedger {
    async fn query_open_items(&self, tax_id: &str) -> Result<Vec<OpenLedgerItem>> {
        self.breaker
            .call(|| self.inner.query_open_items(tax_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconError;
    use crate::resilience::CircuitState;

    struct FailingLedger;

    #[async_trait]
    impl LedgerClient for FailingLedger {
        async fn query_open_items(&self, _tax_id: &str) -> Result<Vec<OpenLedgerItem>> {
            Err(ReconError::external("ledger", "connection refused"))
        }
    }

    #[tokio::test]
    async fn test_guarded_ledger_fails_fast_after_threshold() {
        let guarded = GuardedLedger::new(
            Arc::new(FailingLedger),
            &BreakerConfig {
                failure_threshold: 2,
                cooldown_ms: 60_000,
            },
        );

        for _ in 0..2 {
            let err = guarded.query_open_items("12345678").await.unwrap_err();
            assert!(matches!(err, ReconError::ExternalService { .. }));
        }
        assert_eq!(guarded.breaker().state(), CircuitState::Open);

        let err = guarded.query_open_items("12345678").await.unwrap_err();
        assert!(matches!(err, ReconError::CircuitOpen { .. }));
    }
}
