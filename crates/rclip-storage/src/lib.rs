//! Filesystem-resident session storage.
//!
//! This crate provides:
//! - The output/uploads layout and exclusive session directories
//! - A background retention sweeper for expired entries
//! - Streaming zip archives of a session's clips

pub mod archive;
pub mod error;
pub mod layout;
pub mod retention;

pub use archive::{SessionArchive, SessionArchiver, ARCHIVE_COMPRESSION_LEVEL};
pub use error::{StorageError, StorageResult};
pub use layout::{StorageLayout, DEFAULT_OUTPUT_DIR, DEFAULT_UPLOADS_DIR};
pub use retention::{
    RetentionSweeper, SweepReport, SweeperHandle, DEFAULT_RETENTION_THRESHOLD,
    DEFAULT_SWEEP_INTERVAL, SWEEP_FAILED_TOTAL, SWEEP_REMOVED_TOTAL,
};
