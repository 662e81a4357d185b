//! Jittered exponential backoff for recoverable job failures.

use std::time::Duration;

/// Delay before a job's next attempt: `min(base * 2^retry_count + jitter,
/// max)`. Jitter is multiplicative in `[0, jitter_factor]` to spread out
/// herds of jobs failing against the same collaborator.
pub fn retry_delay(base_ms: u64, max_ms: u64, jitter_factor: f64, retry_count: u32) -> Duration {
    let exponent = retry_count.min(20);
    let raw_ms = base_ms.saturating_mul(1u64 << exponent);
    let delay = Duration::from_millis(raw_ms.min(max_ms));

    let jittered = if jitter_factor > 0.0 {
        delay.mul_f64(1.0 + fastrand::f64() * jitter_factor)
    } else {
        delay
    };
    jittered.min(Duration::from_millis(max_ms))
}
