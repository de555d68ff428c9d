//! Testing utilities and mock implementations.
//!
//! Mocks for the collaborator traits, so the orchestrator can be exercised
//! without external tools or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use baggins_core::testing::{fixtures, MockTransformer};
//! use baggins_core::JobOrchestrator;
//!
//! let transformer = MockTransformer::new();
//! let orchestrator = JobOrchestrator::new(fixtures::fast_config(2), Arc::new(transformer.clone()));
//!
//! let id = orchestrator.submit(fixtures::extract_request("uploads/a.mp4", 0.0, 30.0)).await?;
//! let job = orchestrator.await_completion(&id).await?;
//! ```

mod mock_intake;
mod mock_transformer;

pub use mock_intake::{MockIntake, RecordedSave};
pub use mock_transformer::{MockOperation, MockTransformer, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::PathBuf;

    use crate::orchestrator::{JobRequest, ProcessorConfig};
    use crate::transformer::Segment;

    /// Config with `capacity` slots and short deadlines.
    pub fn fast_config(capacity: usize) -> ProcessorConfig {
        ProcessorConfig::default()
            .with_max_concurrent_jobs(capacity)
            .with_admission_timeout_secs(10)
            .with_job_timeout_secs(30)
    }

    /// Clip request for a local file.
    pub fn extract_request(path: &str, start_secs: f64, duration_secs: f64) -> JobRequest {
        JobRequest::Extract {
            input_path: PathBuf::from(path),
            segment: Segment::new(start_secs, duration_secs),
        }
    }

    /// Plain download, optionally clipped afterwards.
    pub fn download_request(url: &str, segment: Option<Segment>) -> JobRequest {
        JobRequest::Download {
            url: url.to_string(),
            segment,
        }
    }

    /// YouTube audio download, optionally clipped afterwards.
    pub fn youtube_request(video_id: &str, segment: Option<Segment>) -> JobRequest {
        JobRequest::YoutubeExtract {
            url: format!("https://www.youtube.com/watch?v={}", video_id),
            segment,
        }
    }
}
