//! Clip session processing.
//!
//! This crate provides:
//! - Random segment planning over a source duration
//! - Session allocation and sequential clip extraction
//! - End-to-end request processing (resolve, plan, transcode)
//! - Structured session logging

pub mod config;
pub mod error;
pub mod logging;
pub mod planner;
pub mod processor;
pub mod session;

pub use config::{WorkerConfig, MAX_CLIPS_PER_SESSION};
pub use error::{TranscodeFailure, WorkerError, WorkerResult};
pub use logging::SessionLogger;
pub use planner::{DurationSource, RandomDurations, SegmentPlanner, MIN_WINDOW_SECS};
pub use processor::{ClipProcessor, ProcessOutcome, SESSIONS_FAILED_TOTAL};
pub use session::{Session, SessionManager, CLIPS_PRODUCED_TOTAL};
