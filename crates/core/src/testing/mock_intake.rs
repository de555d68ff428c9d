//! Mock intake for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::intake::{Intake, IntakeError};

/// A recorded save for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSave {
    pub file_name: String,
    pub size: usize,
    pub path: PathBuf,
}

/// Mock implementation of the Intake trait.
///
/// Keeps nothing on disk; returns the path a real intake would have used and
/// records what was saved.
#[derive(Debug, Clone)]
pub struct MockIntake {
    uploads_dir: PathBuf,
    saves: Arc<RwLock<Vec<RecordedSave>>>,
    /// If set, the next save will fail with this error.
    next_error: Arc<RwLock<Option<IntakeError>>>,
}

impl Default for MockIntake {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIntake {
    /// Create a new mock intake.
    pub fn new() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            saves: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all recorded saves.
    pub async fn recorded_saves(&self) -> Vec<RecordedSave> {
        self.saves.read().await.clone()
    }

    /// Configure the next save to fail with the given error.
    pub async fn set_next_error(&self, error: IntakeError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl Intake for MockIntake {
    fn name(&self) -> &str {
        "mock"
    }

    async fn save_inbound(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, IntakeError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let name = match Path::new(file_name).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let path = self.uploads_dir.join(name);

        self.saves.write().await.push(RecordedSave {
            file_name: file_name.to_string(),
            size: bytes.len(),
            path: path.clone(),
        });

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_saves() {
        let intake = MockIntake::new();

        let path = intake.save_inbound("talk.mp4", b"data").await.unwrap();
        assert!(path.starts_with("uploads"));
        assert_eq!(path.extension().unwrap(), "mp4");

        let saves = intake.recorded_saves().await;
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].size, 4);
    }

    #[tokio::test]
    async fn test_next_error() {
        let intake = MockIntake::new();
        intake.set_next_error(IntakeError::Empty).await;

        assert!(matches!(
            intake.save_inbound("a.mp3", b"x").await,
            Err(IntakeError::Empty)
        ));
        assert!(intake.save_inbound("a.mp3", b"x").await.is_ok());
    }
}
