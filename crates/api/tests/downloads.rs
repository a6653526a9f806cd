//! Download handler behavior against real files on disk.
//!
//! These tests call the handler directly with an already-authenticated
//! key, so they run without a database; the lazy pool is never touched.

use std::path::PathBuf;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use tempfile::TempDir;

use comfygate_api::auth::jwt::JwtConfig;
use comfygate_api::config::ServerConfig;
use comfygate_api::handlers::download::download_output;
use comfygate_api::middleware::api_key::ApiKeyAuth;
use comfygate_api::state::AppState;

fn state_with_output_dir(dir: PathBuf) -> AppState {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy("postgres://postgres@127.0.0.1:1/comfygate_test")
        .expect("lazy pool creation cannot fail");

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        comfyui_url: "http://127.0.0.1:1".to_string(),
        template_dir: std::env::temp_dir(),
        input_dir: std::env::temp_dir(),
        output_dirs: vec![dir],
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
    };
    AppState::new(pool, config)
}

fn auth() -> ApiKeyAuth {
    ApiKeyAuth {
        key_id: 1,
        key_name: "test-key".to_string(),
    }
}

#[tokio::test]
async fn streams_file_with_attachment_headers() {
    let dir = TempDir::new().expect("tempdir");
    let payload: Vec<u8> = (0u8..=255).cycle().take(64 * 1024).collect();
    std::fs::write(dir.path().join("render.mp4"), &payload).expect("write output file");

    let state = state_with_output_dir(dir.path().to_path_buf());
    let response = download_output(auth(), State(state), Path("render.mp4".to_string()))
        .await
        .expect("download should succeed");

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE].to_str().unwrap(), "video/mp4");
    assert_eq!(
        headers[header::CONTENT_LENGTH].to_str().unwrap(),
        payload.len().to_string()
    );
    assert_eq!(
        headers[header::CONTENT_DISPOSITION].to_str().unwrap(),
        "attachment; filename=\"render.mp4\""
    );

    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collect")
        .to_bytes();
    assert_eq!(bytes.as_ref(), payload.as_slice());
}

#[tokio::test]
async fn missing_file_answers_404() {
    let dir = TempDir::new().expect("tempdir");
    let state = state_with_output_dir(dir.path().to_path_buf());

    let err = download_output(auth(), State(state), Path("nope.png".to_string()))
        .await
        .expect_err("missing file must fail");
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn path_components_in_filename_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let state = state_with_output_dir(dir.path().to_path_buf());

    let err = download_output(auth(), State(state), Path("../etc/passwd".to_string()))
        .await
        .expect_err("traversal must be rejected");
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}
