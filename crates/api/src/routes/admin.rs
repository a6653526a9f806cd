//! Route definitions for the `/admin` resource (admin role required).

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{api_keys, users};
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET  /api-keys              -> list_api_keys
/// POST /api-keys              -> create_api_key
/// POST /api-keys/{id}/revoke  -> revoke_api_key
/// GET  /users                 -> list_users
/// POST /users                 -> create_user
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api-keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route("/api-keys/{id}/revoke", post(api_keys::revoke_api_key))
        .route("/users", get(users::list_users).post(users::create_user))
}
