use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Gate capacity and timeouts are non-zero
/// - Uploads and processed directories differ
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let processor = &config.processor;

    if processor.max_concurrent_jobs == 0 {
        return Err(ConfigError::ValidationError(
            "processor.max_concurrent_jobs cannot be 0".to_string(),
        ));
    }

    if processor.admission_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "processor.admission_timeout_secs cannot be 0".to_string(),
        ));
    }

    if processor.job_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "processor.job_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.storage.uploads_dir == config.storage.processed_dir {
        return Err(ConfigError::ValidationError(format!(
            "storage.uploads_dir and storage.processed_dir must differ (both {:?})",
            config.storage.uploads_dir
        )));
    }

    Ok(())
}
