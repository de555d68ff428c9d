//! Error types for the transformer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors a transformer can report.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Fetching remote media failed.
    #[error("Network error: {0}")]
    Network(String),

    /// The external tool failed.
    #[error("Execution failed: {reason}")]
    ExecutionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The tool reported success but produced no output.
    #[error("Output file not created: {path}")]
    OutputMissing { path: PathBuf },

    /// The operation exceeded its time budget.
    #[error("Operation timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The operation was cancelled through its token.
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    /// Creates a new execution failed error with stderr output.
    pub fn execution_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network(reason.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Network(_) | Self::Io(_))
    }
}
