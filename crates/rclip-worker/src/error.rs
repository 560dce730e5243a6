//! Worker error types.

use thiserror::Error;

use rclip_media::MediaError;
use rclip_models::ClipRecord;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// A clip transcode that failed partway through a session.
///
/// Clips produced before the failure are carried along; their files stay on
/// disk.
#[derive(Debug, Clone, Error)]
#[error("clip {index} failed: {message}")]
pub struct TranscodeFailure {
    /// 1-based index of the failing clip
    pub index: u32,
    /// Collaborator's error message
    pub message: String,
    /// Clips completed before the failure
    pub clips: Vec<ClipRecord>,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{}", .0.detail())]
    SourceResolution(MediaError),

    #[error("no clips could be planned for a {duration:.1}s source")]
    EmptyPlan { duration: f64 },

    #[error(transparent)]
    Transcode(#[from] TranscodeFailure),

    #[error("Storage error: {0}")]
    Storage(#[from] rclip_storage::StorageError),
}

impl WorkerError {
    pub fn source_resolution(err: MediaError) -> Self {
        Self::SourceResolution(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = WorkerError::EmptyPlan { duration: 0.4 };
        assert_eq!(err.to_string(), "no clips could be planned for a 0.4s source");

        let err = WorkerError::from(TranscodeFailure {
            index: 2,
            message: "FFmpeg command failed: exit 1".to_string(),
            clips: Vec::new(),
        });
        assert_eq!(err.to_string(), "clip 2 failed: FFmpeg command failed: exit 1");

        let err = WorkerError::source_resolution(MediaError::YtDlpNotFound);
        assert_eq!(err.to_string(), "yt-dlp not found in PATH");
    }
}
