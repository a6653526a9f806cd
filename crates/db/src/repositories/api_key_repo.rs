//! Repository for the `api_keys` table.

use comfygate_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::api_key::ApiKey;

const API_KEY_COLUMNS: &str = "\
    id, name, key_hash, key_prefix, created_by, is_active, \
    last_used_at, expires_at, revoked_at, created_at";

/// Provides CRUD operations for API keys.
pub struct ApiKeyRepo;

impl ApiKeyRepo {
    /// Create a new API key. Returns the full row (with hash).
    pub async fn create(
        pool: &PgPool,
        name: &str,
        key_hash: &str,
        key_prefix: &str,
        created_by: DbId,
        expires_at: Option<Timestamp>,
    ) -> Result<ApiKey, sqlx::Error> {
        let query = format!(
            "INSERT INTO api_keys (name, key_hash, key_prefix, created_by, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {API_KEY_COLUMNS}"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(name)
            .bind(key_hash)
            .bind(key_prefix)
            .bind(created_by)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// List all API keys, newest first. `key_hash` is never serialized.
    pub async fn list(pool: &PgPool) -> Result<Vec<ApiKey>, sqlx::Error> {
        let query = format!("SELECT {API_KEY_COLUMNS} FROM api_keys ORDER BY created_at DESC");
        sqlx::query_as::<_, ApiKey>(&query).fetch_all(pool).await
    }

    /// Find an API key by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ApiKey>, sqlx::Error> {
        let query = format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE id = $1");
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an active, non-revoked, non-expired API key by its SHA-256 hash.
    ///
    /// This is the authentication lookup: anything revoked, deactivated,
    /// or past its expiry is treated as absent.
    pub async fn find_active_by_hash(
        pool: &PgPool,
        key_hash: &str,
    ) -> Result<Option<ApiKey>, sqlx::Error> {
        let query = format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys \
             WHERE key_hash = $1 AND is_active = TRUE AND revoked_at IS NULL \
               AND (expires_at IS NULL OR expires_at > now())"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(key_hash)
            .fetch_optional(pool)
            .await
    }

    /// Stamp `last_used_at` after a successful authentication.
    pub async fn touch_last_used(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE api_keys SET last_used_at = now() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Instantly revoke an API key. Sets `revoked_at` and `is_active = false`.
    pub async fn revoke(pool: &PgPool, id: DbId) -> Result<Option<ApiKey>, sqlx::Error> {
        let query = format!(
            "UPDATE api_keys SET revoked_at = now(), is_active = FALSE \
             WHERE id = $1 AND revoked_at IS NULL \
             RETURNING {API_KEY_COLUMNS}"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
