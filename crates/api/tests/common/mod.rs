//! Shared helpers for API integration tests.
//!
//! These tests exercise the real router and middleware stack without a
//! live Postgres instance: the pool is created lazily and only paths that
//! never reach the database assert on success responses.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use comfygate_api::auth::jwt::JwtConfig;
use comfygate_api::config::ServerConfig;
use comfygate_api::router::build_app_router;
use comfygate_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        comfyui_url: "http://127.0.0.1:1".to_string(),
        template_dir: std::env::temp_dir(),
        input_dir: std::env::temp_dir(),
        output_dirs: vec![std::env::temp_dir()],
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
    }
}

/// Build the full application router with the production middleware stack.
///
/// The pool connects lazily, so tests that never hit the database run
/// without one; anything that does reach it fails fast via the short
/// acquire timeout.
pub fn build_test_app() -> Router {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy("postgres://postgres@127.0.0.1:1/comfygate_test")
        .expect("lazy pool creation cannot fail");

    let config = test_config();
    let state = AppState::new(pool, config.clone());
    build_app_router(state, &config)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request build"),
    )
    .await
    .expect("request should not error")
}

/// Issue a request with explicit method, headers, and JSON body.
pub fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri)
}

/// Collect a response body into parsed JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}
