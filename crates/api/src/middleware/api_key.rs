//! API key authentication for the machine-facing `/api` surface.
//!
//! Callers authenticate with `Authorization: Key <token>`. The raw token is
//! hashed with SHA-256 and looked up against active, unrevoked, unexpired
//! keys; the stored plaintext is never persisted anywhere.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use comfygate_core::api_keys::hash_api_key;
use comfygate_core::error::CoreError;
use comfygate_core::types::DbId;
use comfygate_db::repositories::ApiKeyRepo;

use crate::error::AppError;
use crate::state::AppState;

/// Proof that the request carried a valid API key.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    /// The id of the authenticated key row.
    pub key_id: DbId,
    /// The key's human-assigned name, for log attribution.
    pub key_name: String,
}

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Key ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Key <api-key>".into(),
            ))
        })?;

        let key_hash = hash_api_key(token.trim());
        let key = ApiKeyRepo::find_active_by_hash(&state.pool, &key_hash)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Invalid or revoked API key".into()))
            })?;

        // Best-effort usage stamp; a failure here must not reject the request.
        if let Err(err) = ApiKeyRepo::touch_last_used(&state.pool, key.id).await {
            tracing::warn!(key_id = key.id, error = %err, "failed to update api key last_used_at");
        }

        Ok(ApiKeyAuth {
            key_id: key.id,
            key_name: key.name,
        })
    }
}
