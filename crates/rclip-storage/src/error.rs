//! Storage error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session directory already exists: {0}")]
    SessionExists(PathBuf),

    #[error("Directory not writable: {0}")]
    NotWritable(PathBuf),

    #[error("Archive failed: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<zip::result::ZipError> for StorageError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e),
            other => Self::Archive(other.to_string()),
        }
    }
}

impl From<walkdir::Error> for StorageError {
    fn from(err: walkdir::Error) -> Self {
        Self::Archive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_zip_io_error_keeps_its_kind() {
        let err: StorageError =
            zip::result::ZipError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "closed")).into();
        assert!(matches!(err, StorageError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe));

        let err: StorageError = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(err, StorageError::Archive(_)));
    }
}
