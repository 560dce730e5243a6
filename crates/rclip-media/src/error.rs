//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while resolving or transcoding media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Source resolution failed: {message}")]
    ResolveFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Invalid source metadata: {0}")]
    InvalidMetadata(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Output file missing after transcode: {0}")]
    OutputMissing(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a source resolution failure error.
    pub fn resolve_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ResolveFailed {
            message: message.into(),
            stderr,
        }
    }

    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata(message.into())
    }

    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry(message.into())
    }

    /// Human-readable cause including the collaborator's stderr, if any.
    pub fn detail(&self) -> String {
        match self {
            MediaError::FfmpegFailed {
                stderr: Some(stderr),
                ..
            }
            | MediaError::ResolveFailed {
                stderr: Some(stderr),
                ..
            } if !stderr.trim().is_empty() => format!("{}: {}", self, stderr.trim()),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_includes_stderr() {
        let err = MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("Invalid too big or non positive size\n".to_string()),
            Some(1),
        );
        assert_eq!(
            err.detail(),
            "FFmpeg command failed: FFmpeg exited with non-zero status: Invalid too big or non positive size"
        );
    }

    #[test]
    fn test_detail_without_stderr() {
        let err = MediaError::resolve_failed("no stream URL", None);
        assert_eq!(err.detail(), "Source resolution failed: no stream URL");
    }
}
