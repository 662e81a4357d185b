//! Environment-driven configuration with typed fields and loud failures
//! on unparseable values.

use crate::error::{ReconError, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReconConfig {
    /// Fixed number of workers in the pool.
    pub worker_count: usize,
    /// Maximum recoverable-failure retries before a job is dead-lettered.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Jitter factor in [0, 1] applied on top of the exponential delay.
    pub backoff_jitter: f64,
    /// Upper bound on one extraction (fetch + analyze) call. Exceeding it
    /// is a recoverable failure, not a queue-wide stall.
    pub extraction_timeout_ms: u64,
    /// Worker sleep between polls when the queue is empty.
    pub idle_poll_ms: u64,
    /// Per-stage history retained by the pipeline tracker.
    pub tracker_history_limit: usize,
    pub bind_address: String,
    pub matching: MatchingConfig,
    pub breaker: BreakerConfig,
}

#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Soft-match amount tolerance, in the same minor currency units
    /// amounts are stored in.
    pub amount_tolerance_minor: i64,
    /// Maximum Levenshtein distance for invoice-number proximity.
    pub invoice_number_max_distance: usize,
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before a half-open trial.
    pub cooldown_ms: u64,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            max_retries: 3,
            backoff_base_ms: 1_000,
            backoff_max_ms: 60_000,
            backoff_jitter: 0.1,
            extraction_timeout_ms: 30_000,
            idle_poll_ms: 250,
            tracker_history_limit: 1_000,
            bind_address: "127.0.0.1:8080".to_string(),
            matching: MatchingConfig::default(),
            breaker: BreakerConfig::default(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            amount_tolerance_minor: 5,
            invoice_number_max_distance: 2,
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_ms: 30_000,
        }
    }
}

impl ReconConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(bind) = std::env::var("RECON_BIND_ADDRESS") {
            config.bind_address = bind;
        }
        config.worker_count = parse_env("RECON_WORKER_COUNT", config.worker_count)?;
        config.max_retries = parse_env("RECON_MAX_RETRIES", config.max_retries)?;
        config.backoff_base_ms = parse_env("RECON_BACKOFF_BASE_MS", config.backoff_base_ms)?;
        config.backoff_max_ms = parse_env("RECON_BACKOFF_MAX_MS", config.backoff_max_ms)?;
        config.backoff_jitter = parse_env("RECON_BACKOFF_JITTER", config.backoff_jitter)?;
        config.extraction_timeout_ms =
            parse_env("RECON_EXTRACTION_TIMEOUT_MS", config.extraction_timeout_ms)?;
        config.idle_poll_ms = parse_env("RECON_IDLE_POLL_MS", config.idle_poll_ms)?;
        config.tracker_history_limit =
            parse_env("RECON_TRACKER_HISTORY_LIMIT", config.tracker_history_limit)?;
        config.matching.amount_tolerance_minor = parse_env(
            "RECON_AMOUNT_TOLERANCE_MINOR",
            config.matching.amount_tolerance_minor,
        )?;
        config.matching.invoice_number_max_distance = parse_env(
            "RECON_INVOICE_NUMBER_MAX_DISTANCE",
            config.matching.invoice_number_max_distance,
        )?;
        config.breaker.failure_threshold = parse_env(
            "RECON_BREAKER_FAILURE_THRESHOLD",
            config.breaker.failure_threshold,
        )?;
        config.breaker.cooldown_ms =
            parse_env("RECON_BREAKER_COOLDOWN_MS", config.breaker.cooldown_ms)?;

        if config.worker_count == 0 {
            return Err(ReconError::Configuration(
                "RECON_WORKER_COUNT must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| ReconError::Configuration(format!("Invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}
