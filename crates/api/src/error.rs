use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use comfygate_comfyui::api::ComfyUiApiError;
use comfygate_comfyui::outputs::OutputError;
use comfygate_comfyui::workflow::{PatchError, TemplateError};
use comfygate_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors plus the patcher/relay error
/// enums, and implements [`IntoResponse`] to produce consistent
/// `{error, code}` JSON bodies. Raw transport errors never leak to the
/// caller; they are logged and replaced with a sanitized message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `comfygate_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Template loading/patching failure (server misconfiguration).
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// ComfyUI relay failure (unreachable, rejected, or malformed reply).
    #[error(transparent)]
    Backend(#[from] ComfyUiApiError),

    /// Output file resolution failure.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<PatchError> for AppError {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::Validation(core) => AppError::Core(core),
            PatchError::Template(template) => AppError::Template(template),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Template errors: server misconfiguration, not caller's fault ---
            AppError::Template(err) => {
                tracing::error!(error = %err, "Workflow template error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TEMPLATE_ERROR",
                    "Failed to load workflow template".to_string(),
                )
            }

            // --- Relay errors: upstream failure, potentially transient ---
            AppError::Backend(err) => {
                tracing::error!(error = %err, "ComfyUI relay error");
                let message = match err {
                    ComfyUiApiError::MissingPromptId => "Invalid response from ComfyUI server",
                    _ => "Failed to communicate with ComfyUI server",
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "BACKEND_ERROR",
                    message.to_string(),
                )
            }

            // --- Output resolution ---
            AppError::Output(err) => match err {
                OutputError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                OutputError::InvalidName(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
