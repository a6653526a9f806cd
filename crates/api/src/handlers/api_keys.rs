//! Admin handlers for API key management.
//!
//! Keys are generated server-side; the plaintext is returned exactly once
//! in the creation response and only its SHA-256 hash is stored.

use axum::extract::{Path, State};
use axum::http::StatusCode;

use comfygate_core::api_keys::generate_api_key;
use comfygate_core::error::CoreError;
use comfygate_core::types::DbId;
use comfygate_db::models::api_key::{ApiKey, ApiKeyCreatedResponse, CreateApiKey};
use comfygate_db::repositories::ApiKeyRepo;

use crate::error::{AppError, AppResult};
use crate::extract::Json;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /admin/api-keys
///
/// Create a new API key. The response is the only place the plaintext key
/// ever appears.
pub async fn create_api_key(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateApiKey>,
) -> AppResult<(StatusCode, Json<DataResponse<ApiKeyCreatedResponse>>)> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "API key name is required".into(),
        )));
    }

    let generated = generate_api_key();
    let key = ApiKeyRepo::create(
        &state.pool,
        name,
        &generated.hash,
        &generated.prefix,
        admin.user_id,
        input.expires_at,
    )
    .await?;

    tracing::info!(key_id = key.id, name = %key.name, created_by = admin.user_id, "API key created");

    let response = ApiKeyCreatedResponse {
        id: key.id,
        name: key.name,
        key_prefix: key.key_prefix,
        plaintext_key: generated.plaintext,
        created_at: key.created_at,
    };

    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// GET /admin/api-keys
///
/// List all keys, newest first. Hashes are never serialized.
pub async fn list_api_keys(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ApiKey>>>> {
    let keys = ApiKeyRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: keys }))
}

/// POST /admin/api-keys/{id}/revoke
///
/// Revoke a key immediately. Revoking an already-revoked or unknown key
/// reports 404 so the caller learns the key was already gone.
pub async fn revoke_api_key(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ApiKey>>> {
    let key = ApiKeyRepo::revoke(&state.pool, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "ApiKey",
                id,
            })
        })?;

    tracing::info!(key_id = key.id, name = %key.name, revoked_by = admin.user_id, "API key revoked");

    Ok(Json(DataResponse { data: key }))
}
