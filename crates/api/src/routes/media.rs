//! Route definitions for the machine-facing `/api` generation surface.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation::MAX_UPLOAD_BYTES;
use crate::handlers::{download, generation, status};
use crate::state::AppState;

/// Routes mounted at `/api`. All require `Authorization: Key <token>`.
///
/// ```text
/// POST /flux-text-to-image        -> generate_flux
/// POST /wan-text-to-video         -> generate_wan_t2v
/// POST /wan-image-to-video        -> generate_wan_i2v (multipart)
/// POST /framepack-image-to-video  -> generate_framepack (multipart)
/// GET  /status/{process_id}       -> check_status
/// GET  /download/{filename}       -> download_output
/// ```
pub fn router() -> Router<AppState> {
    // The upload routes get their own body limit; the default 2 MiB cap
    // stays in place for everything else.
    let uploads = Router::new()
        .route("/wan-image-to-video", post(generation::generate_wan_i2v))
        .route(
            "/framepack-image-to-video",
            post(generation::generate_framepack),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        .route("/flux-text-to-image", post(generation::generate_flux))
        .route("/wan-text-to-video", post(generation::generate_wan_t2v))
        .route("/status/{process_id}", get(status::check_status))
        .route("/download/{filename}", get(download::download_output))
        .merge(uploads)
}
