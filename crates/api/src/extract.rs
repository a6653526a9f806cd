//! Request extractors with error mapping onto [`AppError`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;

/// JSON body extractor that rejects malformed bodies with a 400.
///
/// `axum::Json` answers 422 when a body is syntactically valid JSON but
/// fails deserialization (missing field, wrong type). The external
/// contract treats every malformed body as a validation failure, so this
/// wrapper folds all [`JsonRejection`] cases into
/// [`AppError::BadRequest`] and the usual `{error, code}` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(map_rejection(rejection)),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

fn map_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::BadRequest("Expected Content-Type: application/json".to_string())
        }
        other => AppError::BadRequest(other.body_text()),
    }
}
