//! On-disk layout of the output and uploads roots.

use std::path::{Path, PathBuf};

use rclip_models::{ClipRecord, SessionId};
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Default output root.
pub const DEFAULT_OUTPUT_DIR: &str = "output";
/// Default uploads root.
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

const WRITE_PROBE: &str = ".rclip-write-probe";

/// Filesystem roots owned by the service.
///
/// Every session owns exactly one directory `<output_root>/<session_id>/`,
/// holding `clip_<n>.mp4` files and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    output_root: PathBuf,
    uploads_root: PathBuf,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR, DEFAULT_UPLOADS_DIR)
    }
}

impl StorageLayout {
    pub fn new(output_root: impl Into<PathBuf>, uploads_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            uploads_root: uploads_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn uploads_root(&self) -> &Path {
        &self.uploads_root
    }

    /// Roots visited by the retention sweeper.
    pub fn roots(&self) -> [&Path; 2] {
        [&self.output_root, &self.uploads_root]
    }

    /// Directory owned by `session_id`.
    pub fn session_dir(&self, session_id: &SessionId) -> PathBuf {
        self.output_root.join(session_id.as_str())
    }

    /// Path of clip `index` inside the session directory.
    pub fn clip_path(&self, session_id: &SessionId, index: u32) -> PathBuf {
        self.session_dir(session_id).join(ClipRecord::file_name(index))
    }

    /// Create both roots if they are missing.
    pub async fn ensure_dirs(&self) -> StorageResult<()> {
        for root in self.roots() {
            tokio::fs::create_dir_all(root).await?;
        }
        Ok(())
    }

    /// Create the session directory, failing if it already exists.
    pub async fn create_session_dir(&self, session_id: &SessionId) -> StorageResult<PathBuf> {
        tokio::fs::create_dir_all(&self.output_root).await?;

        let dir = self.session_dir(session_id);
        match tokio::fs::create_dir(&dir).await {
            Ok(()) => {
                debug!(session_id = %session_id, "Created session directory {}", dir.display());
                Ok(dir)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StorageError::SessionExists(dir))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify both roots accept writes.
    pub async fn check_writable(&self) -> StorageResult<()> {
        for root in self.roots() {
            let probe = root.join(WRITE_PROBE);
            tokio::fs::write(&probe, b"ok")
                .await
                .map_err(|_| StorageError::NotWritable(root.to_path_buf()))?;
            let _ = tokio::fs::remove_file(&probe).await;
        }
        Ok(())
    }
}
