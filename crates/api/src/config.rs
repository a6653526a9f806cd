use std::path::PathBuf;

use crate::auth::jwt::JwtConfig;

/// Default ComfyUI output directory probed for finished files.
const DEFAULT_OUTPUT_DIR: &str = "/workspace/ComfyUI/output";

/// Auxiliary pipeline temp directory probed after the engine's own output.
const DEFAULT_AUX_OUTPUT_DIR: &str = "/tmp/latentsync_b9e6a424/latentsync_1076d504";

/// Server configuration loaded from environment variables.
///
/// All fields except secrets have defaults suitable for local development.
/// There are no ambient globals: this struct is built once in `main` and
/// handed to the components that need it.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Base HTTP URL of the ComfyUI instance.
    pub comfyui_url: String,
    /// Directory holding workflow template JSON files.
    pub template_dir: PathBuf,
    /// ComfyUI input directory where uploaded source images are written.
    pub input_dir: PathBuf,
    /// Ordered candidate directories probed when serving output downloads.
    pub output_dirs: Vec<PathBuf>,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                          |
    /// |------------------------|----------------------------------|
    /// | `HOST`                 | `0.0.0.0`                        |
    /// | `PORT`                 | `3000`                           |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`          |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                             |
    /// | `COMFYUI_URL`          | `http://localhost:8188`          |
    /// | `TEMPLATE_DIR`         | `.`                              |
    /// | `COMFYUI_INPUT_DIR`    | `/workspace/ComfyUI/input`       |
    /// | `OUTPUT_DIRS`          | engine output dir + aux temp dir |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let comfyui_url =
            std::env::var("COMFYUI_URL").unwrap_or_else(|_| "http://localhost:8188".into());

        let template_dir = PathBuf::from(std::env::var("TEMPLATE_DIR").unwrap_or_else(|_| ".".into()));

        let input_dir = PathBuf::from(
            std::env::var("COMFYUI_INPUT_DIR")
                .unwrap_or_else(|_| "/workspace/ComfyUI/input".into()),
        );

        let output_dirs: Vec<PathBuf> = std::env::var("OUTPUT_DIRS")
            .unwrap_or_else(|_| format!("{DEFAULT_OUTPUT_DIR},{DEFAULT_AUX_OUTPUT_DIR}"))
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            comfyui_url,
            template_dir,
            input_dir,
            output_dirs,
            jwt,
        }
    }
}
