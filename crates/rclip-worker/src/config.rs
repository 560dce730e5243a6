//! Worker configuration.

use std::time::Duration;

use rclip_media::source::{DEFAULT_FORMAT, DEFAULT_RESOLVE_TIMEOUT};
use rclip_models::EncodingConfig;

/// Upper bound on clips produced for one session.
pub const MAX_CLIPS_PER_SESSION: usize = 50;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum clips planned per session
    pub max_clips_per_session: usize,
    /// Per-clip FFmpeg timeout; unlimited when `None`
    pub transcode_timeout: Option<Duration>,
    /// yt-dlp format selector
    pub source_format: String,
    /// Time allowed for one yt-dlp metadata lookup
    pub resolve_timeout: Duration,
    /// Encoding applied to every clip
    pub encoding: EncodingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_clips_per_session: MAX_CLIPS_PER_SESSION,
            transcode_timeout: None,
            source_format: DEFAULT_FORMAT.to_string(),
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            encoding: EncodingConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            transcode_timeout: std::env::var("TRANSCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs),
            source_format: std::env::var("YTDLP_FORMAT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.source_format.clone()),
            resolve_timeout: std::env::var("RESOLVE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.resolve_timeout),
            encoding: match std::env::var("FFMPEG_CRF").ok().and_then(|s| s.parse().ok()) {
                Some(crf) => defaults.encoding.clone().with_crf(crf),
                None => defaults.encoding.clone(),
            },
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_clips_per_session, 50);
        assert_eq!(config.source_format, "best[ext=mp4]/best");
        assert_eq!(config.resolve_timeout, Duration::from_secs(60));
        assert!(config.transcode_timeout.is_none());
    }
}
