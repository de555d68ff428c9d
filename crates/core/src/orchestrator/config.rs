//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for job execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum transformer operations running at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_jobs: usize,

    /// How long a job may wait for a worker slot (seconds).
    #[serde(default = "default_admission_timeout")]
    pub admission_timeout_secs: u64,

    /// Upper bound for a single transformer call (seconds).
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,

    /// Whether plain downloads also take a worker slot.
    #[serde(default = "default_gate_downloads")]
    pub gate_downloads: bool,
}

fn default_max_concurrent() -> usize {
    5
}

fn default_admission_timeout() -> u64 {
    300 // 5 minutes
}

fn default_job_timeout() -> u64 {
    3600 // 1 hour
}

fn default_gate_downloads() -> bool {
    true
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent(),
            admission_timeout_secs: default_admission_timeout(),
            job_timeout_secs: default_job_timeout(),
            gate_downloads: default_gate_downloads(),
        }
    }
}

impl ProcessorConfig {
    /// Sets the gate capacity.
    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Sets the admission deadline in seconds.
    pub fn with_admission_timeout_secs(mut self, secs: u64) -> Self {
        self.admission_timeout_secs = secs;
        self
    }

    /// Sets the per-operation timeout in seconds.
    pub fn with_job_timeout_secs(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    /// Enables or disables gating of plain downloads.
    pub fn with_gate_downloads(mut self, enabled: bool) -> Self {
        self.gate_downloads = enabled;
        self
    }

    pub fn admission_timeout(&self) -> Duration {
        Duration::from_secs(self.admission_timeout_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}
