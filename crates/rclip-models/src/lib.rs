//! Shared data models for the RandClip backend.
//!
//! This crate provides Serde-serializable types for:
//! - Session identity
//! - Planned segment windows and produced clip records
//! - Segmentation requests, duration ranges and resolution modes
//! - Encoding configuration

pub mod clip;
pub mod encoding;
pub mod request;
pub mod resolution;
pub mod session;

// Re-export common types
pub use clip::{ClipRecord, SegmentWindow};
pub use encoding::EncodingConfig;
pub use request::{DurationRange, ProcessRequest, RequestError, SegmentationRequest};
pub use resolution::{
    CustomGeometry, ResolutionMode, ResolutionParseError, DEFAULT_CUSTOM_HEIGHT, DEFAULT_CUSTOM_WIDTH,
};
pub use session::{SessionId, SessionIdError};
