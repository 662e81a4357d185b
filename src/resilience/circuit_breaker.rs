//! # Circuit Breaker
//!
//! Per-collaborator fail-fast guard. After a configured number of
//! consecutive failures the circuit opens and rejects calls immediately;
//! once the cooldown elapses, a single half-open trial call decides
//! whether to close again or re-open.
//!
//! Rejections surface as [`ReconError::CircuitOpen`] so callers can
//! report "service temporarily unavailable" instead of a generic failure.

use crate::config::BreakerConfig;
use crate::error::{ReconError, Result};
use parking_lot::Mutex;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, calls pass through.
    Closed,
    /// Failing fast, all calls rejected until the cooldown elapses.
    Open,
    /// One trial call in flight to check for recovery.
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: &BreakerConfig) -> Self {
        Self {
            name: name.into(),
            failure_threshold: config.failure_threshold,
            cooldown: Duration::from_millis(config.cooldown_ms),
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Run an operation under the breaker. The lock is only held for the
    /// admission check and the outcome bookkeeping, never across the
    /// operation itself.
    ///
    /// Every admitted call settles exactly once: if the returned future is
    /// dropped mid-flight (a caller-side timeout cancelling the operation),
    /// the admission records a failure on drop. A cancelled half-open trial
    /// therefore re-opens the circuit instead of leaving `trial_in_flight`
    /// set forever, and repeated timeouts trip a closed circuit just like
    /// explicit errors.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.admit()?;
        let mut admission = Admission {
            breaker: self,
            settled: false,
        };
        let outcome = operation().await;
        admission.settled = true;
        match outcome {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(error) => {
                self.on_failure();
                Err(error)
            }
        }
    }

    fn admit(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|at| at.elapsed()).unwrap_or_default();
                if elapsed >= self.cooldown {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    info!(service = %self.name, "🟡 Circuit half-open, admitting trial call");
                    Ok(())
                } else {
                    Err(ReconError::CircuitOpen {
                        service: self.name.clone(),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(ReconError::CircuitOpen {
                        service: self.name.clone(),
                    })
                } else {
                    inner.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.trial_in_flight = false;
                info!(service = %self.name, "🟢 Circuit closed (recovered)");
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    warn!(
                        service = %self.name,
                        consecutive_failures = inner.consecutive_failures,
                        "🔴 Circuit opened (failing fast)"
                    );
                }
            }
            CircuitState::HalfOpen => {
                // Trial failed; back to failing fast for another cooldown.
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.trial_in_flight = false;
                warn!(service = %self.name, "🔴 Circuit re-opened after failed trial");
            }
            CircuitState::Open => {}
        }
    }
}

/// Tracks one admitted call until its outcome is recorded.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_failure();
        }
    }
}
