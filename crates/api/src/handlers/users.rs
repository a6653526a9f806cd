//! Admin handlers for user account management.

use axum::extract::State;
use axum::http::StatusCode;

use comfygate_core::error::CoreError;
use comfygate_core::roles::{ROLE_ADMIN, ROLE_USER};
use comfygate_db::models::user::{CreateUser, User};
use comfygate_db::repositories::UserRepo;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::extract::Json;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /admin/users
///
/// Create a new account. The role defaults to `user`; only `admin` and
/// `user` are accepted.
pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    let username = input.username.trim();
    if username.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "username is required".into(),
        )));
    }
    if input.email.trim().is_empty() || !input.email.contains('@') {
        return Err(AppError::Core(CoreError::Validation(
            "A valid email is required".into(),
        )));
    }

    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let role = input.role.as_deref().unwrap_or(ROLE_USER);
    if role != ROLE_ADMIN && role != ROLE_USER {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown role '{role}'"
        ))));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(&state.pool, username, input.email.trim(), &password_hash, role)
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, role = %user.role, "User created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// GET /admin/users
///
/// List all accounts, newest first. Password hashes are never serialized.
pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<User>>>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: users }))
}
