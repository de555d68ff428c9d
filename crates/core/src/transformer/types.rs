//! Types for the transformer module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::job::JobId;

/// A time range within a media file, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub start_secs: f64,
    pub duration_secs: f64,
}

impl Segment {
    pub fn new(start_secs: f64, duration_secs: f64) -> Self {
        Self {
            start_secs,
            duration_secs,
        }
    }

    /// A segment only counts as requested when either bound is positive.
    pub fn requested(start_secs: f64, duration_secs: f64) -> Option<Self> {
        if start_secs > 0.0 || duration_secs > 0.0 {
            Some(Self::new(start_secs, duration_secs))
        } else {
            None
        }
    }

    /// Both bounds finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.start_secs.is_finite()
            && self.duration_secs.is_finite()
            && self.start_secs >= 0.0
            && self.duration_secs >= 0.0
    }
}

/// Clip `segment` out of `input_path` as audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRequest {
    /// Job the output belongs to; implementations name outputs after it.
    pub job_id: JobId,
    pub input_path: PathBuf,
    pub segment: Segment,
}
