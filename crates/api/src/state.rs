use std::sync::Arc;

use comfygate_comfyui::api::ComfyUiApi;
use comfygate_comfyui::outputs::OutputStore;
use comfygate_comfyui::workflow::TemplateStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (credential store).
    pub pool: comfygate_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// REST relay to the ComfyUI instance.
    pub comfyui: Arc<ComfyUiApi>,
    /// Workflow template loader.
    pub templates: Arc<TemplateStore>,
    /// Output file resolver for downloads.
    pub outputs: Arc<OutputStore>,
}

impl AppState {
    /// Build the state from configuration and an established pool.
    pub fn new(pool: comfygate_db::DbPool, config: ServerConfig) -> Self {
        let comfyui = Arc::new(ComfyUiApi::new(config.comfyui_url.clone()));
        let templates = Arc::new(TemplateStore::new(config.template_dir.clone()));
        let outputs = Arc::new(OutputStore::new(config.output_dirs.clone()));

        Self {
            pool,
            config: Arc::new(config),
            comfyui,
            templates,
            outputs,
        }
    }
}
