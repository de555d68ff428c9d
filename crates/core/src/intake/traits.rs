//! Trait definitions for the intake module.

use async_trait::async_trait;
use std::path::PathBuf;

use super::error::IntakeError;

/// Materializes caller-supplied bytes on the filesystem.
#[async_trait]
pub trait Intake: Send + Sync {
    /// Returns the name of this intake implementation.
    fn name(&self) -> &str;

    /// Saves `bytes` and returns where they landed.
    ///
    /// `file_name` is the caller's original name; implementations may use it
    /// only as a hint (e.g. for the extension).
    async fn save_inbound(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, IntakeError>;
}
