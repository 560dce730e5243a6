//! Request orchestration: resolve the source, plan windows, transcode.

use std::sync::Arc;
use std::time::Instant;

use metrics::counter;
use serde::Serialize;
use tracing::{info, Instrument};

use rclip_media::{FfmpegTranscoder, SourceResolver, Transcoder, YtDlpResolver};
use rclip_models::{ClipRecord, SegmentationRequest, SessionId};
use rclip_storage::StorageLayout;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::SessionLogger;
use crate::planner::{DurationSource, RandomDurations, SegmentPlanner};
use crate::session::SessionManager;

/// Counter of requests that produced no clips.
pub const SESSIONS_FAILED_TOTAL: &str = "rclip_sessions_failed_total";

/// Result of a processing run that produced at least one clip.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub session_id: SessionId,
    pub clips: Vec<ClipRecord>,
    /// Set when the run stopped early after a transcode failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Runs a validated request end to end.
#[derive(Clone)]
pub struct ClipProcessor {
    planner: SegmentPlanner,
    sessions: SessionManager,
    resolver: Arc<dyn SourceResolver>,
    transcoder: Arc<dyn Transcoder>,
}

impl ClipProcessor {
    pub fn new(
        config: &WorkerConfig,
        layout: StorageLayout,
        resolver: Arc<dyn SourceResolver>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            planner: SegmentPlanner::new(config.max_clips_per_session),
            sessions: SessionManager::new(layout),
            resolver,
            transcoder,
        }
    }

    /// Processor backed by yt-dlp and FFmpeg.
    pub fn with_external_tools(config: &WorkerConfig, layout: StorageLayout) -> Self {
        let mut transcoder = FfmpegTranscoder::new(config.encoding.clone());
        if let Some(timeout) = config.transcode_timeout {
            transcoder = transcoder.with_timeout(timeout.as_secs());
        }
        Self::new(
            config,
            layout,
            Arc::new(
                YtDlpResolver::new()
                    .with_format(config.source_format.clone())
                    .with_timeout(config.resolve_timeout),
            ),
            Arc::new(transcoder),
        )
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Process `request` with randomly drawn window lengths.
    pub async fn process(&self, request: &SegmentationRequest) -> WorkerResult<ProcessOutcome> {
        let mut durations = RandomDurations::from_os_rng();
        self.process_with(request, &mut durations).await
    }

    /// Process `request`, drawing window lengths from `durations`.
    ///
    /// A transcode failure after at least one clip still succeeds, with the
    /// produced clips and a warning. Failing before any clip exists is an
    /// error.
    pub async fn process_with<D>(
        &self,
        request: &SegmentationRequest,
        durations: &mut D,
    ) -> WorkerResult<ProcessOutcome>
    where
        D: DurationSource + Send + ?Sized,
    {
        let started = Instant::now();
        info!(
            url = %request.url,
            min_dur = request.range.min(),
            max_dur = request.range.max(),
            resolution = %request.resolution,
            "Processing video"
        );

        let source = self
            .resolver
            .resolve(&request.url)
            .await
            .map_err(|e| failed("resolve", WorkerError::source_resolution(e)))?;

        let windows = self.planner.plan(source.duration, request.range, durations);
        if windows.is_empty() {
            return Err(failed(
                "plan",
                WorkerError::EmptyPlan {
                    duration: source.duration,
                },
            ));
        }

        let mut session = self.sessions.create_session().await?;
        let logger = SessionLogger::new(session.id(), "segmentation");
        logger.log_start(&format!(
            "{} windows over {:.1}s source ({}, {}x{})",
            windows.len(),
            source.duration,
            request.resolution,
            source.width,
            source.height
        ));

        let result = self
            .sessions
            .run_segmentation(
                &mut session,
                &source,
                &windows,
                request.resolution,
                request.custom,
                self.transcoder.as_ref(),
            )
            .instrument(logger.create_span())
            .await;

        match result {
            Ok(clips) => {
                logger.log_completion(&format!(
                    "{} clips in {:.1}s",
                    clips.len(),
                    started.elapsed().as_secs_f64()
                ));
                Ok(ProcessOutcome {
                    session_id: session.id().clone(),
                    clips,
                    warning: None,
                })
            }
            Err(failure) if !failure.clips.is_empty() => {
                let warning = format!(
                    "Stopped after {} of {} clips: {}",
                    failure.clips.len(),
                    windows.len(),
                    failure
                );
                logger.log_warning(&warning);
                Ok(ProcessOutcome {
                    session_id: session.id().clone(),
                    clips: failure.clips,
                    warning: Some(warning),
                })
            }
            Err(failure) => {
                logger.log_error(&failure.to_string());
                Err(failed("transcode", failure.into()))
            }
        }
    }
}

fn failed(stage: &'static str, err: WorkerError) -> WorkerError {
    counter!(SESSIONS_FAILED_TOTAL, "stage" => stage).increment(1);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rclip_media::{MediaError, MediaResult, SourceInfo, TranscodeJob};
    use rclip_models::{CustomGeometry, DurationRange, ResolutionMode};

    use crate::planner::tests::ScriptedDurations;

    struct FakeResolver {
        duration: f64,
    }

    #[async_trait]
    impl SourceResolver for FakeResolver {
        async fn resolve(&self, reference: &str) -> MediaResult<SourceInfo> {
            if reference.contains("private") {
                return Err(MediaError::resolve_failed(
                    "yt-dlp exited with status Some(1)",
                    Some("ERROR: Private video".to_string()),
                ));
            }
            Ok(SourceInfo {
                locator: format!("{}/stream", reference),
                duration: self.duration,
                width: 1280,
                height: 720,
                title: None,
            })
        }
    }

    #[derive(Default)]
    struct FakeTranscoder {
        fail_from: Option<usize>,
        jobs: Mutex<Vec<TranscodeJob>>,
    }

    #[async_trait]
    impl Transcoder for FakeTranscoder {
        async fn transcode(&self, job: &TranscodeJob) -> MediaResult<()> {
            let n = {
                let mut jobs = self.jobs.lock().unwrap();
                jobs.push(job.clone());
                jobs.len()
            };
            if self.fail_from.is_some_and(|from| n >= from) {
                return Err(MediaError::ffmpeg_failed("exit status 1", None, Some(1)));
            }
            tokio::fs::write(&job.output, b"mp4").await?;
            Ok(())
        }
    }

    fn request(url: &str) -> SegmentationRequest {
        SegmentationRequest {
            url: url.to_string(),
            range: DurationRange::new(10, 20).unwrap(),
            resolution: ResolutionMode::Original,
            custom: CustomGeometry::default(),
        }
    }

    fn processor(
        tmp: &tempfile::TempDir,
        duration: f64,
        transcoder: Arc<FakeTranscoder>,
    ) -> ClipProcessor {
        ClipProcessor::new(
            &WorkerConfig::default(),
            StorageLayout::new(tmp.path().join("output"), tmp.path().join("uploads")),
            Arc::new(FakeResolver { duration }),
            transcoder,
        )
    }

    #[tokio::test]
    async fn test_forty_five_second_source_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder::default());
        let processor = processor(&tmp, 45.0, Arc::clone(&transcoder));

        let outcome = processor
            .process_with(
                &request("https://youtu.be/abc"),
                &mut ScriptedDurations::new(&[20, 15, 20]),
            )
            .await
            .unwrap();

        assert!(outcome.warning.is_none());
        let id = outcome.session_id.as_str();
        let expected = [(1, 20.0), (2, 15.0), (3, 10.0)];
        assert_eq!(outcome.clips.len(), expected.len());
        for (clip, (n, duration)) in outcome.clips.iter().zip(expected) {
            assert_eq!(clip.name, format!("clip_{}.mp4", n));
            assert_eq!(clip.url, format!("/output/{}/clip_{}.mp4", id, n));
            assert_eq!(clip.duration, duration);
        }

        let jobs = transcoder.jobs.lock().unwrap();
        let mut cursor = 0.0;
        for job in jobs.iter() {
            assert_eq!(job.window.start, cursor);
            assert_eq!(job.input, "https://youtu.be/abc/stream");
            cursor = job.window.end();
        }
        assert_eq!(cursor, 45.0);
        assert!(tmp.path().join("output").join(id).join("clip_3.mp4").exists());
    }

    #[tokio::test]
    async fn test_partial_failure_returns_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder {
            fail_from: Some(3),
            ..Default::default()
        });
        let processor = processor(&tmp, 45.0, transcoder);

        let outcome = processor
            .process_with(
                &request("https://youtu.be/abc"),
                &mut ScriptedDurations::new(&[20, 15, 20]),
            )
            .await
            .unwrap();

        assert_eq!(outcome.clips.len(), 2);
        let warning = outcome.warning.unwrap();
        assert!(warning.starts_with("Stopped after 2 of 3 clips: clip 3 failed"));
    }

    #[tokio::test]
    async fn test_first_clip_failure_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder {
            fail_from: Some(1),
            ..Default::default()
        });
        let processor = processor(&tmp, 45.0, transcoder);

        let err = processor
            .process(&request("https://youtu.be/abc"))
            .await
            .unwrap_err();
        match err {
            WorkerError::Transcode(failure) => {
                assert_eq!(failure.index, 1);
                assert!(failure.clips.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolution_failure_creates_no_session() {
        let tmp = tempfile::tempdir().unwrap();
        let processor = processor(&tmp, 45.0, Arc::new(FakeTranscoder::default()));

        let err = processor
            .process(&request("https://youtu.be/private"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::SourceResolution(_)));
        assert!(err.to_string().contains("Private video"));
        assert!(!tmp.path().join("output").exists());
    }

    #[tokio::test]
    async fn test_zero_length_source_is_empty_plan() {
        let tmp = tempfile::tempdir().unwrap();
        let processor = processor(&tmp, 0.5, Arc::new(FakeTranscoder::default()));

        let err = processor
            .process(&request("https://youtu.be/abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::EmptyPlan { .. }));
    }

    #[test]
    fn test_outcome_wire_shape() {
        let id = SessionId::new();
        let outcome = ProcessOutcome {
            session_id: id.clone(),
            clips: vec![ClipRecord::new(&id, 1, 12.0)],
            warning: None,
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["sessionId"], id.as_str());
        assert_eq!(json["clips"][0]["name"], "clip_1.mp4");
        assert!(json.get("warning").is_none());
    }
}
