//! Frame image handler.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::error::ApiResult;
use crate::state::AppState;

/// Serve the stored JPEG of a sampled frame.
pub async fn get_frame(
    State(state): State<AppState>,
    Path(frame_index): Path<usize>,
) -> ApiResult<impl IntoResponse> {
    let bytes = state
        .engine
        .frame_image(&state.config.frames_dir, frame_index)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        bytes,
    ))
}
