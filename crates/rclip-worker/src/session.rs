//! Session lifecycle and sequential clip extraction.

use std::path::{Path, PathBuf};

use metrics::counter;
use tracing::debug;

use rclip_media::{ResolutionTransform, SourceInfo, TranscodeJob, Transcoder};
use rclip_models::{ClipRecord, CustomGeometry, ResolutionMode, SegmentWindow, SessionId};
use rclip_storage::{StorageError, StorageLayout};

use crate::error::{TranscodeFailure, WorkerResult};
use crate::logging::SessionLogger;

/// Counter of clips successfully written.
pub const CLIPS_PRODUCED_TOTAL: &str = "rclip_clips_produced_total";

/// Attempts at allocating a fresh session directory before giving up.
const CREATE_ATTEMPTS: usize = 3;

/// One processing run and the directory it owns.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    dir: PathBuf,
    clips: Vec<ClipRecord>,
}

impl Session {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Clips produced so far, in plan order.
    pub fn clips(&self) -> &[ClipRecord] {
        &self.clips
    }
}

/// Allocates sessions and runs their windows through a transcoder.
#[derive(Debug, Clone)]
pub struct SessionManager {
    layout: StorageLayout,
}

impl SessionManager {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Allocate a new session with its own empty output directory.
    ///
    /// The directory is created exclusively, so two sessions never share one.
    pub async fn create_session(&self) -> WorkerResult<Session> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let id = SessionId::new();
            match self.layout.create_session_dir(&id).await {
                Ok(dir) => {
                    debug!(session_id = %id, "Session created");
                    return Ok(Session {
                        id,
                        dir,
                        clips: Vec::new(),
                    });
                }
                Err(StorageError::SessionExists(_)) if attempt < CREATE_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Transcode `windows` in order into `session`.
    ///
    /// Stops at the first failure. Clips written before it are kept both on
    /// disk and in the returned [`TranscodeFailure`].
    pub async fn run_segmentation(
        &self,
        session: &mut Session,
        source: &SourceInfo,
        windows: &[SegmentWindow],
        resolution: ResolutionMode,
        custom: CustomGeometry,
        transcoder: &dyn Transcoder,
    ) -> Result<Vec<ClipRecord>, TranscodeFailure> {
        let transform = ResolutionTransform::derive(resolution, custom, source.height)
            .map_err(|e| TranscodeFailure {
                index: 1,
                message: e.detail(),
                clips: Vec::new(),
            })?;

        let logger = SessionLogger::new(&session.id, "segmentation");

        for (position, window) in windows.iter().enumerate() {
            let index = position as u32 + 1;
            let job = TranscodeJob {
                input: source.locator.clone(),
                output: self.layout.clip_path(&session.id, index),
                window: *window,
                transform,
            };

            if let Err(e) = transcoder.transcode(&job).await {
                return Err(TranscodeFailure {
                    index,
                    message: e.detail(),
                    clips: session.clips.clone(),
                });
            }

            counter!(CLIPS_PRODUCED_TOTAL).increment(1);
            logger.log_progress(&format!(
                "clip {}/{} created ({:.1}s from {:.1}s)",
                index,
                windows.len(),
                window.duration,
                window.start
            ));
            session
                .clips
                .push(ClipRecord::new(&session.id, index, window.duration));
        }

        Ok(session.clips.clone())
    }
}
