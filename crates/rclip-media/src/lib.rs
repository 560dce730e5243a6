//! FFmpeg and yt-dlp wrappers for random clip extraction.
//!
//! This crate provides:
//! - Source resolution to a direct stream URL via yt-dlp
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeouts for child processes
//! - Resolution filters for the supported output modes

pub mod clip;
pub mod command;
pub mod error;
pub mod filters;
pub mod progress;
pub mod source;

pub use clip::{FfmpegTranscoder, TranscodeJob, Transcoder, FFMPEG_DURATION_SECONDS};
pub use command::{check_ffmpeg, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use filters::{portrait_width, ResolutionTransform};
pub use progress::FfmpegProgress;
pub use source::{SourceInfo, SourceResolver, YtDlpResolver};
