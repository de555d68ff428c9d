use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::orchestrator::ProcessorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Where inbound and produced media lives on disk
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Inbound files (uploads and fetched media).
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    /// Extracted audio.
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    /// Largest inbound payload accepted by the intake, in bytes.
    #[serde(default = "default_max_inbound_bytes")]
    pub max_inbound_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            processed_dir: default_processed_dir(),
            max_inbound_bytes: default_max_inbound_bytes(),
        }
    }
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("processed")
}

fn default_max_inbound_bytes() -> u64 {
    50 * 1024 * 1024 // 50 MB
}
