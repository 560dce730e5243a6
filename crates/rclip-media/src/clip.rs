//! Clip extraction.
//!
//! Each clip is one FFmpeg invocation that seeks into the source, reads a
//! single window and re-encodes it with an optional geometry filter.

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use metrics::histogram;
use tracing::{debug, info};

use rclip_models::{EncodingConfig, SegmentWindow};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::ResolutionTransform;

/// Histogram of per-clip FFmpeg wall time.
pub const FFMPEG_DURATION_SECONDS: &str = "rclip_ffmpeg_duration_seconds";

/// One window of the source to be written to `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    /// Playable locator of the source
    pub input: String,
    /// Destination file
    pub output: PathBuf,
    pub window: SegmentWindow,
    pub transform: ResolutionTransform,
}

impl TranscodeJob {
    /// Build the FFmpeg command for this job.
    pub fn to_command(&self, encoding: &EncodingConfig) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(self.input.clone(), &self.output)
            .seek(self.window.start)
            .duration(self.window.duration);

        if let Some(filter) = self.transform.to_filter() {
            cmd = cmd.video_filter(filter);
        }

        cmd.output_args(encoding.to_ffmpeg_args())
    }
}

/// Writes one clip per job.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, job: &TranscodeJob) -> MediaResult<()>;
}

/// [`Transcoder`] that shells out to FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    encoding: EncodingConfig,
    timeout_secs: Option<u64>,
}

impl FfmpegTranscoder {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            timeout_secs: None,
        }
    }

    /// Kill FFmpeg if a single clip takes longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> MediaResult<()> {
        let cmd = job.to_command(&self.encoding);

        let mut runner = FfmpegRunner::new();
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }

        info!(
            start = job.window.start,
            duration = job.window.duration,
            "Creating clip {}",
            job.output.display()
        );

        let total_ms = (job.window.duration * 1000.0) as i64;
        let started = Instant::now();
        let result = runner
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    "Clip progress: {:.1}% (speed {:.2}x)",
                    progress.percentage(total_ms),
                    progress.speed
                );
            })
            .await;

        let outcome = if result.is_ok() { "success" } else { "failure" };
        histogram!(FFMPEG_DURATION_SECONDS, "outcome" => outcome)
            .record(started.elapsed().as_secs_f64());
        result?;

        match tokio::fs::metadata(&job.output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(MediaError::OutputMissing(job.output.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rclip_models::CustomGeometry;

    fn job(transform: ResolutionTransform) -> TranscodeJob {
        TranscodeJob {
            input: "https://cdn.example.com/v.mp4".to_string(),
            output: PathBuf::from("output/s/clip_1.mp4"),
            window: SegmentWindow::new(12.5, 7.0),
            transform,
        }
    }

    #[test]
    fn test_passthrough_has_no_filter() {
        let args = job(ResolutionTransform::Passthrough)
            .to_command(&EncodingConfig::default())
            .build_args();

        assert!(!args.iter().any(|a| a == "-vf"));
        assert!(args.windows(2).any(|w| w[0] == "-ss" && w[1] == "12.500"));
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "7.000"));
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx264"));
        assert_eq!(args.last().unwrap(), "output/s/clip_1.mp4");
    }

    #[test]
    fn test_letterbox_filter_is_applied() {
        let frame = CustomGeometry {
            width: 720,
            height: 1280,
        };
        let args = job(ResolutionTransform::Letterbox(frame))
            .to_command(&EncodingConfig::default())
            .build_args();

        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert!(args[vf + 1].starts_with("scale=720:1280:force_original_aspect_ratio=decrease"));
    }
}
