//! Handler for `GET /api/download/{filename}`.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Response, StatusCode};
use comfygate_core::media::content_type_for;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::middleware::api_key::ApiKeyAuth;
use crate::state::AppState;

/// GET /api/download/{filename}
///
/// Serve a finished output file as an attachment. The filename is resolved
/// against the configured candidate directories in order; path components
/// in the request are rejected before any filesystem access. The body is
/// streamed, so video outputs are never buffered whole in memory.
pub async fn download_output(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response<Body>> {
    let path = state.outputs.resolve(&filename)?;

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to stat output file: {e}")))?;
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to open output file: {e}")))?;
    let stream = ReaderStream::new(file);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&filename))
        .header(header::CONTENT_LENGTH, metadata.len().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(response)
}
