//! Error types for the intake module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while saving inbound media.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Payload was empty.
    #[error("Inbound payload is empty")]
    Empty,

    /// Payload exceeds the configured limit.
    #[error("Inbound payload of {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// Failed to create the uploads directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
