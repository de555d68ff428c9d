//! Types for the job orchestrator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::gate::GateStatus;
use crate::job::{JobId, JobKind};
use crate::transformer::Segment;

/// Errors returned to callers of the orchestrator.
///
/// Failures inside a running job never surface here; they are recorded on
/// the job itself.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Job not found.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The request was rejected before a job was created.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The orchestrator no longer accepts work.
    #[error("orchestrator is shutting down")]
    ShuttingDown,
}

/// Work a caller can submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobRequest {
    /// Fetch a remote file, then clip it if a segment is given.
    Download {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        segment: Option<Segment>,
    },
    /// Clip a segment of a local file.
    Extract {
        input_path: PathBuf,
        segment: Segment,
    },
    /// Fetch audio from a YouTube page, then clip it if a segment is given.
    YoutubeExtract {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        segment: Option<Segment>,
    },
}

impl JobRequest {
    /// Picks the request kind from the URL, like the public `process` endpoint.
    ///
    /// YouTube links go through the audio extractor, anything else is
    /// downloaded directly. A segment is attached only if `start_secs` or
    /// `duration_secs` is positive.
    pub fn from_url(url: impl Into<String>, start_secs: f64, duration_secs: f64) -> Self {
        let url = url.into();
        let segment = Segment::requested(start_secs, duration_secs);

        if is_youtube_url(&url) {
            JobRequest::YoutubeExtract { url, segment }
        } else {
            JobRequest::Download { url, segment }
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Download { .. } => JobKind::Download,
            JobRequest::Extract { .. } => JobKind::Extract,
            JobRequest::YoutubeExtract { .. } => JobKind::YoutubeExtract,
        }
    }

    /// Rejects requests that could never succeed.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        let segment = match self {
            JobRequest::Download { url, segment } | JobRequest::YoutubeExtract { url, segment } => {
                if url.trim().is_empty() {
                    return Err(OrchestratorError::InvalidRequest(
                        "URL is required".to_string(),
                    ));
                }
                segment.as_ref()
            }
            JobRequest::Extract {
                input_path,
                segment,
            } => {
                if input_path.as_os_str().is_empty() {
                    return Err(OrchestratorError::InvalidRequest(
                        "input path is required".to_string(),
                    ));
                }
                Some(segment)
            }
        };

        match segment {
            Some(s) if !s.is_valid() => Err(OrchestratorError::InvalidRequest(format!(
                "invalid segment: start={} duration={}",
                s.start_secs, s.duration_secs
            ))),
            _ => Ok(()),
        }
    }
}

fn is_youtube_url(url: &str) -> bool {
    url.contains("youtube.com") || url.contains("youtu.be")
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether new submissions are accepted.
    pub running: bool,
    /// Gate occupancy.
    pub gate: GateStatus,
    /// Jobs waiting for a worker slot or not yet started.
    pub pending_count: usize,
    /// Jobs currently running.
    pub running_count: usize,
    /// Jobs that completed.
    pub completed_count: usize,
    /// Jobs that failed.
    pub failed_count: usize,
}
