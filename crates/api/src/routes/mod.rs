pub mod admin;
pub mod auth;
pub mod health;
pub mod media;

use axum::Router;

use crate::state::AppState;

/// Build the authenticated route tree mounted at the application root.
///
/// Route hierarchy:
///
/// ```text
/// /api/flux-text-to-image          queue a text-to-image job (POST)
/// /api/wan-text-to-video           queue a text-to-video job (POST)
/// /api/wan-image-to-video          queue an image-to-video job (POST, multipart)
/// /api/framepack-image-to-video    queue a start/end frame job (POST, multipart)
/// /api/status/{process_id}         poll job status (GET)
/// /api/download/{filename}         fetch a finished output (GET)
///
/// /auth/login                      login (public)
/// /auth/refresh                    refresh (public)
/// /auth/logout                     logout (requires auth)
///
/// /admin/api-keys                  list, create (admin only)
/// /admin/api-keys/{id}/revoke      revoke key (POST)
/// /admin/users                     list, create (admin only)
/// ```
///
/// `/health` is mounted separately at root level by the router builder.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Machine-facing generation surface (API-key auth, flat JSON).
        .nest("/api", media::router())
        // Authentication routes (login, refresh, logout).
        .nest("/auth", auth::router())
        // Admin routes (API key + user management).
        .nest("/admin", admin::router())
}
