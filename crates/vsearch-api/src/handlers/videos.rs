//! Video upload, indexing and streaming handlers.

use std::path::PathBuf;

use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{error, info};
use uuid::Uuid;

use vsearch_index::EngineError;
use vsearch_models::IndexRequest;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Accepted upload extensions.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// Upload response.
#[derive(Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub path: String,
    pub size_bytes: u64,
}

/// Index response.
#[derive(Serialize)]
pub struct IndexResponse {
    pub status: String,
    pub frames: usize,
    pub video: String,
}

/// Reduce a client-supplied name to its final path component.
///
/// Returns `None` for names with no usable component.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}

fn has_video_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn video_path(state: &AppState, name: &str) -> ApiResult<PathBuf> {
    let name = sanitize_filename(name).ok_or_else(|| ApiError::bad_request("Invalid filename"))?;
    Ok(state.config.video_dir.join(name))
}

/// Store an uploaded video file.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let Some(original) = field.file_name().map(str::to_string) else {
            continue;
        };

        let filename =
            sanitize_filename(&original).ok_or_else(|| ApiError::bad_request("Invalid filename"))?;
        if !has_video_extension(&filename) {
            return Err(ApiError::bad_request("Invalid video format"));
        }

        fs::create_dir_all(&state.config.video_dir).await?;
        let path = state.config.video_dir.join(&filename);
        let partial = state
            .config
            .video_dir
            .join(format!(".{}.{}.part", filename, Uuid::new_v4().simple()));

        let size_bytes = match store_field(&mut field, &partial, &path).await {
            Ok(size_bytes) => size_bytes,
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        metrics::record_upload_bytes(size_bytes);
        info!(filename = %filename, size_bytes, "Video uploaded");

        return Ok(Json(UploadResponse {
            filename,
            path: path.display().to_string(),
            size_bytes,
        }));
    }

    Err(ApiError::bad_request("No file field in upload"))
}

/// Stream a multipart field to `partial`, then move it to `path`.
async fn store_field(
    field: &mut Field<'_>,
    partial: &std::path::Path,
    path: &std::path::Path,
) -> ApiResult<u64> {
    let mut file = fs::File::create(partial).await?;
    let mut size_bytes = 0u64;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::bad_request(format!("Upload interrupted: {}", e)))?
    {
        size_bytes += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    drop(file);
    fs::rename(partial, path).await?;

    Ok(size_bytes)
}

/// Build the search index for an uploaded video and persist it.
pub async fn index_video(
    State(state): State<AppState>,
    Query(request): Query<IndexRequest>,
) -> ApiResult<Json<IndexResponse>> {
    request.validate().map_err(EngineError::InvalidParameter)?;

    let path = video_path(&state, &request.filename)?;
    if !fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ApiError::not_found(format!(
            "Video not found: {}",
            request.filename
        )));
    }

    let frames = state
        .engine
        .build(&path, &state.config.frames_dir, request.fps)
        .await?;

    if let Err(e) = state.engine.save(&state.config.index_path).await {
        error!(
            frames,
            error = %e,
            "Index is serving queries but was not saved; it will be lost on restart"
        );
        return Err(ApiError::NotPersisted { frames, source: e });
    }

    Ok(Json(IndexResponse {
        status: "indexed".to_string(),
        frames,
        video: request.filename,
    }))
}

/// Stream an uploaded video, honoring range requests.
pub async fn get_video(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let path = video_path(&state, &filename)?;
    if !fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ApiError::not_found("Video not found"));
    }

    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new);
    if response.status().is_success() {
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
        headers.insert(
            "cross-origin-resource-policy",
            HeaderValue::from_static("cross-origin"),
        );
    }

    Ok(response)
}
