//! Clip processing handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::warn;

use rclip_models::ProcessRequest;
use rclip_worker::ProcessOutcome;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// `POST /api/process`: segment a remote video into random clips.
///
/// Runs to completion before responding. Dropping the connection drops this
/// future, which kills any FFmpeg child still running.
pub async fn process_video(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<Json<ProcessOutcome>> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!("Rejected process body: {}", rejection.body_text());
        ApiError::bad_request(rejection.body_text())
    })?;
    let request = payload.validate()?;

    match state.processor.process(&request).await {
        Ok(outcome) => {
            let label = if outcome.warning.is_some() { "partial" } else { "complete" };
            metrics::record_session(label);
            Ok(Json(outcome))
        }
        Err(e) => {
            metrics::record_session("failed");
            Err(e.into())
        }
    }
}
