//! File system intake implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::config::StorageConfig;

use super::error::IntakeError;
use super::traits::Intake;

/// Writes inbound payloads into the uploads directory under a fresh name.
pub struct FsIntake {
    uploads_dir: PathBuf,
    max_bytes: u64,
}

impl FsIntake {
    /// Creates an intake writing to `storage.uploads_dir`.
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            uploads_dir: storage.uploads_dir.clone(),
            max_bytes: storage.max_inbound_bytes,
        }
    }

    /// Creates an intake with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(&StorageConfig::default())
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Extension of the caller's file name, if it looks like one.
    fn extension_hint(file_name: &str) -> Option<String> {
        let ext = Path::new(file_name).extension()?.to_str()?;
        let plausible =
            !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric());
        plausible.then(|| ext.to_ascii_lowercase())
    }

    /// Writes under a temporary name so readers never see a half-written
    /// file. The temporary file is removed on any failure.
    async fn persist(partial: &Path, destination: &Path, bytes: &[u8]) -> Result<(), IntakeError> {
        if let Err(e) = Self::write_then_rename(partial, destination, bytes).await {
            let _ = fs::remove_file(partial).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_then_rename(
        partial: &Path,
        destination: &Path,
        bytes: &[u8],
    ) -> std::io::Result<()> {
        let mut file = fs::File::create(partial).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);
        fs::rename(partial, destination).await
    }

    fn target_name(file_name: &str) -> String {
        let stem = Uuid::new_v4().to_string();
        match Self::extension_hint(file_name) {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem,
        }
    }
}

#[async_trait]
impl Intake for FsIntake {
    fn name(&self) -> &str {
        "fs"
    }

    async fn save_inbound(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, IntakeError> {
        if bytes.is_empty() {
            return Err(IntakeError::Empty);
        }

        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(IntakeError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(|e| IntakeError::DirectoryCreationFailed {
                path: self.uploads_dir.clone(),
                source: e,
            })?;

        let destination = self.uploads_dir.join(Self::target_name(file_name));
        let partial = destination.with_extension("part");

        Self::persist(&partial, &destination, bytes).await?;

        debug!(path = %destination.display(), size, "inbound payload saved");
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn intake_in(dir: &TempDir, max_bytes: u64) -> FsIntake {
        FsIntake::new(&StorageConfig {
            uploads_dir: dir.path().join("uploads"),
            processed_dir: dir.path().join("processed"),
            max_inbound_bytes: max_bytes,
        })
    }

    #[test]
    fn test_extension_hint() {
        assert_eq!(FsIntake::extension_hint("clip.MP4"), Some("mp4".to_string()));
        assert_eq!(FsIntake::extension_hint("noext"), None);
        assert_eq!(FsIntake::extension_hint("weird.m p4"), None);
        assert_eq!(FsIntake::extension_hint("../../etc/passwd"), None);
    }

    #[tokio::test]
    async fn test_save_inbound_writes_bytes() {
        let dir = TempDir::new().unwrap();
        let intake = intake_in(&dir, 1024);

        let path = intake.save_inbound("talk.wav", b"RIFF....").await.unwrap();

        assert!(path.starts_with(dir.path().join("uploads")));
        assert_eq!(path.extension().unwrap(), "wav");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"RIFF....");
        assert!(!path.with_extension("part").exists());
    }

    #[tokio::test]
    async fn test_save_inbound_unique_names() {
        let dir = TempDir::new().unwrap();
        let intake = intake_in(&dir, 1024);

        let a = intake.save_inbound("same.mp3", b"a").await.unwrap();
        let b = intake.save_inbound("same.mp3", b"b").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let partial = dir.path().join("clip.part");
        // A non-empty directory in the way makes the rename fail after the write.
        let destination = dir.path().join("occupied");
        std::fs::create_dir(&destination).unwrap();
        std::fs::write(destination.join("keep"), b"x").unwrap();

        let result = FsIntake::persist(&partial, &destination, b"data").await;

        assert!(matches!(result, Err(IntakeError::Io(_))));
        assert!(!partial.exists());
        assert!(destination.join("keep").exists());
    }

    #[tokio::test]
    async fn test_save_inbound_rejects_empty_and_oversized() {
        let dir = TempDir::new().unwrap();
        let intake = intake_in(&dir, 4);

        assert!(matches!(
            intake.save_inbound("a.mp3", b"").await,
            Err(IntakeError::Empty)
        ));
        assert!(matches!(
            intake.save_inbound("a.mp3", b"too long").await,
            Err(IntakeError::TooLarge { size: 8, limit: 4 })
        ));
    }
}
