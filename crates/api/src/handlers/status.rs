//! Handler for `GET /api/status/{process_id}`.

use axum::extract::{Path, State};
use axum::Json;
use comfygate_comfyui::status::{interpret_history, JobStatus};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppResult;
use crate::middleware::api_key::ApiKeyAuth;
use crate::state::AppState;

/// Poll response. `output` and `file_name` are present only once the
/// engine reports success.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub process_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// GET /api/status/{process_id}
///
/// Fetch the engine's history for a job and report either `queued` or
/// `success`. A job the engine has never heard of also reports `queued`;
/// callers are expected to poll until success or give up.
pub async fn check_status(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Path(process_id): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    let history = state.comfyui.get_history(&process_id).await?;

    let response = match interpret_history(&process_id, &history) {
        JobStatus::Succeeded { outputs, file_name } => StatusResponse {
            process_id,
            status: "success",
            output: Some(outputs),
            file_name,
        },
        JobStatus::Queued => StatusResponse {
            process_id,
            status: "queued",
            output: None,
            file_name: None,
        },
    };

    Ok(Json(response))
}
