//! Application state.

use std::sync::Arc;

use rclip_media::{SourceResolver, Transcoder};
use rclip_storage::{SessionArchiver, StorageLayout};
use rclip_worker::ClipProcessor;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub layout: StorageLayout,
    pub processor: ClipProcessor,
    pub archiver: SessionArchiver,
}

impl AppState {
    /// State backed by yt-dlp and FFmpeg.
    pub fn new(config: ApiConfig) -> Self {
        let layout = config.storage_layout();
        let processor = ClipProcessor::with_external_tools(&config.worker, layout.clone());
        Self::from_parts(config, layout, processor)
    }

    /// State with caller-supplied media collaborators.
    pub fn with_collaborators(
        config: ApiConfig,
        resolver: Arc<dyn SourceResolver>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let layout = config.storage_layout();
        let processor = ClipProcessor::new(&config.worker, layout.clone(), resolver, transcoder);
        Self::from_parts(config, layout, processor)
    }

    fn from_parts(config: ApiConfig, layout: StorageLayout, processor: ClipProcessor) -> Self {
        crate::error::hide_internal_details(config.is_production());
        Self {
            archiver: SessionArchiver::new(layout.clone()),
            config,
            layout,
            processor,
        }
    }
}
