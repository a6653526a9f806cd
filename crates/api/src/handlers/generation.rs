//! Handlers for the generation endpoints.
//!
//! Each endpoint validates caller parameters, stages any uploaded source
//! images into the ComfyUI input directory, patches the endpoint's workflow
//! template, and relays the result to ComfyUI's queue. Nothing about the
//! job is persisted here; the returned `process_id` is the engine's own
//! job id and the caller polls `/api/status/{process_id}` with it.

use std::path::PathBuf;

use axum::extract::{Multipart, State};
use comfygate_comfyui::workflow::{patch, EndpointKind, GenerationParams};
use comfygate_core::media::{sanitize_filename, validate_upload_extension};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::extract::Json;
use crate::middleware::api_key::ApiKeyAuth;
use crate::state::AppState;

/// Body cap for the multipart endpoints, applied per-route in place of
/// axum's 2 MiB default. Full-resolution source photos routinely run
/// tens of megabytes.
pub(crate) const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/flux-text-to-image`.
#[derive(Debug, Deserialize)]
pub struct FluxRequest {
    pub prompt: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// Request body for `POST /api/wan-text-to-video`.
#[derive(Debug, Deserialize)]
pub struct WanTextToVideoRequest {
    pub prompt: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    /// Requested clip length in seconds.
    pub video_length: Option<i64>,
}

/// Accepted-job response shared by all generation endpoints.
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    /// The engine-assigned job id the caller polls with.
    pub process_id: String,
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// JSON endpoints
// ---------------------------------------------------------------------------

/// POST /api/flux-text-to-image
///
/// Text-to-image generation. Accepts a prompt and optional resolution.
pub async fn generate_flux(
    auth: ApiKeyAuth,
    State(state): State<AppState>,
    Json(input): Json<FluxRequest>,
) -> AppResult<Json<QueuedResponse>> {
    let params = GenerationParams {
        prompt: input.prompt,
        width: input.width,
        height: input.height,
        ..Default::default()
    };
    relay(&state, &auth, EndpointKind::FluxTextToImage, params, &[]).await
}

/// POST /api/wan-text-to-video
///
/// Text-to-video generation with the Wan 2.1 1.3B model.
pub async fn generate_wan_t2v(
    auth: ApiKeyAuth,
    State(state): State<AppState>,
    Json(input): Json<WanTextToVideoRequest>,
) -> AppResult<Json<QueuedResponse>> {
    let params = GenerationParams {
        prompt: input.prompt,
        width: input.width,
        height: input.height,
        video_length_secs: input.video_length,
        ..Default::default()
    };
    relay(&state, &auth, EndpointKind::WanTextToVideo, params, &[]).await
}

// ---------------------------------------------------------------------------
// Multipart endpoints
// ---------------------------------------------------------------------------

/// POST /api/wan-image-to-video
///
/// Image-to-video generation with the Wan 2.1 14B model. Multipart form
/// with an `image` file plus `prompt`, `width`, `height`, `video_length`
/// text fields.
pub async fn generate_wan_i2v(
    auth: ApiKeyAuth,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<QueuedResponse>> {
    let form = parse_form(multipart, &["image"]).await?;

    let image = form.uploads.first().map(|u| u.filename.clone());
    let params = GenerationParams {
        prompt: form.prompt.unwrap_or_default(),
        width: form.width,
        height: form.height,
        video_length_secs: form.video_length,
        image,
        ..Default::default()
    };

    // Parameter and extension checks happen before anything touches disk.
    params.validate(EndpointKind::WanImageToVideo)?;
    for upload in &form.uploads {
        validate_upload_extension(&upload.filename)?;
    }

    let staged = stage_uploads(&state, &form.uploads).await?;
    relay(&state, &auth, EndpointKind::WanImageToVideo, params, &staged).await
}

/// POST /api/framepack-image-to-video
///
/// Start/end-frame interpolation video. Multipart form with `start_image`
/// and `end_image` files plus a `prompt` text field.
pub async fn generate_framepack(
    auth: ApiKeyAuth,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<QueuedResponse>> {
    let form = parse_form(multipart, &["start_image", "end_image"]).await?;

    let image = form
        .uploads
        .iter()
        .find(|u| u.field == "start_image")
        .map(|u| u.filename.clone());
    let end_image = form
        .uploads
        .iter()
        .find(|u| u.field == "end_image")
        .map(|u| u.filename.clone());

    let params = GenerationParams {
        prompt: form.prompt.unwrap_or_default(),
        image,
        end_image,
        ..Default::default()
    };

    params.validate(EndpointKind::FramepackImageToVideo)?;
    for upload in &form.uploads {
        validate_upload_extension(&upload.filename)?;
    }

    let staged = stage_uploads(&state, &form.uploads).await?;
    relay(
        &state,
        &auth,
        EndpointKind::FramepackImageToVideo,
        params,
        &staged,
    )
    .await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One uploaded file pulled out of a multipart form.
struct Upload {
    /// Multipart field name the file arrived under.
    field: String,
    /// Sanitized filename, as it will appear in the engine's input dir.
    filename: String,
    data: Vec<u8>,
}

/// Text fields plus file uploads extracted from a multipart form.
#[derive(Default)]
struct GenerationForm {
    prompt: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    video_length: Option<i64>,
    uploads: Vec<Upload>,
}

/// Drain a multipart stream into a [`GenerationForm`].
///
/// `file_fields` names the fields treated as file uploads; unknown fields
/// are ignored. Numeric text fields that fail to parse reject the request.
async fn parse_form(mut multipart: Multipart, file_fields: &[&str]) -> AppResult<GenerationForm> {
    let mut form = GenerationForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if file_fields.contains(&name.as_str()) {
            let filename = field
                .file_name()
                .map(sanitize_filename)
                .filter(|f| !f.is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest(format!("Field '{name}' must carry a filename"))
                })?;
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            form.uploads.push(Upload {
                field: name,
                filename,
                data: data.to_vec(),
            });
            continue;
        }

        match name.as_str() {
            "prompt" => {
                form.prompt = Some(read_text(field, &name).await?);
            }
            "width" => form.width = Some(read_int(field, &name).await?),
            "height" => form.height = Some(read_int(field, &name).await?),
            "video_length" => form.video_length = Some(read_int(field, &name).await?),
            _ => {} // ignore unknown fields
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid '{name}' field: {e}")))
}

async fn read_int(field: axum::extract::multipart::Field<'_>, name: &str) -> AppResult<i64> {
    let text = read_text(field, name).await?;
    text.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{name} must be a valid integer")))
}

/// Write validated uploads into the ComfyUI input directory, returning
/// the paths written so they can be removed if the relay fails.
async fn stage_uploads(state: &AppState, uploads: &[Upload]) -> AppResult<Vec<PathBuf>> {
    let input_dir = &state.config.input_dir;
    tokio::fs::create_dir_all(input_dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create input dir: {e}")))?;

    let mut written = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let dest = input_dir.join(&upload.filename);
        if let Err(e) = tokio::fs::write(&dest, &upload.data).await {
            cleanup_uploads(&written).await;
            return Err(AppError::InternalError(format!(
                "Failed to save image file: {e}"
            )));
        }
        written.push(dest);
    }
    Ok(written)
}

/// Best-effort removal of staged uploads after a downstream failure.
async fn cleanup_uploads(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged upload");
        }
    }
}

/// Patch the endpoint's template and relay it to the engine's queue.
///
/// Any staged uploads are removed if patching or submission fails, so a
/// rejected request leaves no orphaned files behind.
async fn relay(
    state: &AppState,
    auth: &ApiKeyAuth,
    kind: EndpointKind,
    params: GenerationParams,
    staged: &[PathBuf],
) -> AppResult<Json<QueuedResponse>> {
    let payload = match patch(state.templates.as_ref(), kind, &params) {
        Ok(payload) => payload,
        Err(e) => {
            cleanup_uploads(staged).await;
            return Err(e.into());
        }
    };

    let handle = match state.comfyui.submit_workflow(&payload).await {
        Ok(handle) => handle,
        Err(e) => {
            cleanup_uploads(staged).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        job_id = %handle.job_id,
        client_id = payload.client_id,
        api_key = %auth.key_name,
        "Generation job queued"
    );

    Ok(Json(QueuedResponse {
        process_id: handle.job_id,
        status: "queued",
    }))
}
