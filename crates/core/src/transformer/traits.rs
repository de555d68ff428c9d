//! Trait definitions for the transformer module.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::job::JobId;

use super::error::TransformError;
use super::types::ClipRequest;

/// Performs media transformations on behalf of jobs.
///
/// Every long-running method receives the job's cancellation token and
/// should return [`TransformError::Cancelled`] promptly once it fires,
/// killing any external process it started.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Returns the name of this transformer implementation.
    fn name(&self) -> &str;

    /// Downloads `url` to local storage and returns the local path.
    async fn fetch(
        &self,
        job_id: &JobId,
        url: &str,
        cancel: CancellationToken,
    ) -> Result<PathBuf, TransformError>;

    /// Extracts the requested segment as audio and returns the output path.
    async fn clip(
        &self,
        request: &ClipRequest,
        cancel: CancellationToken,
    ) -> Result<PathBuf, TransformError>;

    /// Downloads the best audio stream of a video page and returns its path.
    async fn fetch_and_extract_audio(
        &self,
        job_id: &JobId,
        url: &str,
        cancel: CancellationToken,
    ) -> Result<PathBuf, TransformError>;

    /// Validates that the transformer is properly configured and ready.
    async fn validate(&self) -> Result<(), TransformError> {
        Ok(())
    }
}
