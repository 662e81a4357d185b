//! # Error Taxonomy
//!
//! Errors are split along the recoverability boundary: validation and
//! configuration failures are terminal, collaborator and processing
//! failures are routed through the retry path. Every job-level failure
//! carries enough context (field, service, stage) to be attached to the
//! job or dead-letter entry verbatim.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// Malformed or missing required data. Never retried; the job goes
    /// straight to the dead-letter queue with field-level detail.
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// A collaborator (object store, document analyzer, ledger) was
    /// unreachable or returned an error. Recoverable.
    #[error("External service '{service}' failed: {message}")]
    ExternalService { service: String, message: String },

    /// Unexpected internal fault while handling one specific job.
    /// Recoverable, retried with exponential backoff.
    #[error("Processing failed: {message}")]
    Processing { message: String },

    /// Missing or invalid setup. Fatal; halts the affected component
    /// loudly instead of degrading silently.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A circuit breaker rejected the call without invoking the
    /// collaborator. Surfaced distinctly so callers can report
    /// "service temporarily unavailable" rather than a generic failure.
    #[error("Circuit breaker is open for '{service}'")]
    CircuitOpen { service: String },
}

impl ReconError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    /// Whether the failure should be routed through the retry path.
    pub fn recoverable(&self) -> bool {
        match self {
            Self::ExternalService { .. } | Self::Processing { .. } | Self::CircuitOpen { .. } => {
                true
            }
            Self::Validation { .. } | Self::Configuration(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability_split() {
        assert!(!ReconError::validation("amount", "missing").recoverable());
        assert!(!ReconError::Configuration("no bind address".into()).recoverable());
        assert!(ReconError::external("ledger", "timeout").recoverable());
        assert!(ReconError::processing("boom").recoverable());
        assert!(ReconError::CircuitOpen {
            service: "analyzer".into()
        }
        .recoverable());
    }

    #[test]
    fn test_display_carries_context() {
        let err = ReconError::validation("partner_tax_id", "must not be empty");
        assert_eq!(
            err.to_string(),
            "Validation failed for 'partner_tax_id': must not be empty"
        );
    }
}
