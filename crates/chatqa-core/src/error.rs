//! ============================================================================
//! Errors - Failure kinds surfaced by the Q&A pipeline
//! ============================================================================
//! Configuration errors fail fast at construction. Transport and service
//! errors come from outbound calls; the security gate may absorb them per
//! check policy, everything else propagates to the session loop.
//! ============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QaError {
    pub fn config(msg: impl Into<String>) -> Self {
        QaError::Configuration(msg.into())
    }

    /// True for errors raised by a remote call rather than by local state
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            QaError::Transport(_) | QaError::Service { .. } | QaError::ContractViolation(_)
        )
    }
}

impl From<reqwest::Error> for QaError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            QaError::Transport(format!("request timed out: {}", e))
        } else {
            QaError::Transport(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, QaError>;
