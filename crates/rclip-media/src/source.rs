//! Source resolution using yt-dlp.
//!
//! The resolver never downloads the video. It asks yt-dlp for the direct
//! stream URL and metadata, and FFmpeg reads each window straight from that
//! URL.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Format selector preferring a single progressive MP4 stream.
pub const DEFAULT_FORMAT: &str = "best[ext=mp4]/best";

/// Browser user agent sent with metadata requests.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default time allowed for a metadata lookup.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Playable locator and metadata for a video reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Direct stream URL (or local path) readable by FFmpeg
    pub locator: String,
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels (0 when unknown)
    pub width: u32,
    /// Height in pixels (0 when unknown)
    pub height: u32,
    /// Title, when the platform provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Resolves a video reference into a playable source.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> MediaResult<SourceInfo>;
}

/// [`SourceResolver`] backed by `yt-dlp --dump-json`.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    format: String,
    user_agent: String,
    timeout: Duration,
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl YtDlpResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the format selector.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Override the lookup timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_args(&self, reference: &str) -> Vec<String> {
        vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-check-certificates".to_string(),
            "--no-warnings".to_string(),
            "--prefer-free-formats".to_string(),
            "-f".to_string(),
            self.format.clone(),
            "--add-header".to_string(),
            "referer:youtube.com".to_string(),
            "--add-header".to_string(),
            format!("user-agent:{}", self.user_agent),
            "--".to_string(),
            reference.to_string(),
        ]
    }
}

#[async_trait]
impl SourceResolver for YtDlpResolver {
    async fn resolve(&self, reference: &str) -> MediaResult<SourceInfo> {
        check_ytdlp()?;

        let args = self.build_args(reference);
        debug!("Running yt-dlp {}", args.join(" "));

        let child = Command::new("yt-dlp")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => return Err(MediaError::Timeout(self.timeout.as_secs())),
        };

        if !output.status.success() {
            return Err(MediaError::resolve_failed(
                format!("yt-dlp exited with status {:?}", output.status.code()),
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ));
        }

        let info = parse_dump_json(&output.stdout)?;
        info!(
            duration = info.duration,
            width = info.width,
            height = info.height,
            "Resolved direct stream for {}", reference
        );
        Ok(info)
    }
}

/// Subset of yt-dlp's `--dump-json` output.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    url: Option<String>,
    duration: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
    title: Option<String>,
    #[serde(default)]
    requested_formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    url: Option<String>,
    vcodec: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

impl YtDlpFormat {
    fn has_video(&self) -> bool {
        self.vcodec.as_deref().map(|c| c != "none").unwrap_or(true)
    }
}

/// Parse yt-dlp JSON into a [`SourceInfo`].
///
/// Merged formats carry no top-level `url`; the video entry of
/// `requested_formats` is used instead.
pub fn parse_dump_json(bytes: &[u8]) -> MediaResult<SourceInfo> {
    let info: YtDlpInfo = serde_json::from_slice(bytes)?;

    let fallback = info.requested_formats.iter().find(|f| f.has_video());

    let locator = info
        .url
        .clone()
        .or_else(|| fallback.and_then(|f| f.url.clone()))
        .filter(|u| !u.is_empty())
        .ok_or_else(|| MediaError::invalid_metadata("no stream URL in yt-dlp output"))?;

    let duration = info
        .duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| MediaError::invalid_metadata("missing or zero duration"))?;

    let width = info.width.or_else(|| fallback.and_then(|f| f.width));
    let height = info.height.or_else(|| fallback.and_then(|f| f.height));

    Ok(SourceInfo {
        locator,
        duration,
        width: width.unwrap_or(0),
        height: height.unwrap_or(0),
        title: info.title,
    })
}
