//! API key models and DTOs.

use comfygate_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `api_keys` table.
///
/// **Note:** `key_hash` is never serialized to responses. The `key_prefix`
/// field is used for human-readable identification.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApiKey {
    pub id: DbId,
    pub name: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub key_prefix: String,
    pub created_by: DbId,
    pub is_active: bool,
    pub last_used_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub revoked_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Response returned when a new API key is created.
/// Includes the plaintext key (shown exactly once).
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyCreatedResponse {
    pub id: DbId,
    pub name: String,
    pub key_prefix: String,
    /// The full plaintext key. Shown **once** and never stored.
    pub plaintext_key: String,
    pub created_at: Timestamp,
}

/// DTO for creating a new API key.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateApiKey {
    pub name: String,
    /// Optional expiry timestamp (ISO 8601).
    pub expires_at: Option<Timestamp>,
}
