//! Bulk download handler.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;

/// `GET /api/download-all/:session_id`: stream every clip of a session as one zip.
pub async fn download_all(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Response> {
    let archive = state.archiver.open(&session_id).await?;

    let disposition = format!("attachment; filename=\"{}\"", archive.file_name());
    info!(session_id = %archive.session_id(), "Streaming session archive");
    metrics::record_archive_streamed();

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(archive.into_stream()),
    )
        .into_response())
}
