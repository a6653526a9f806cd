//! Workflow template loading and patching.
//!
//! A workflow template is a graph-shaped JSON document mapping node ids to
//! `{class_type, inputs}` objects, stored as `<template_dir>/<name>.json`.
//! Each generation endpoint owns a static patch-rule table that overwrites
//! a small set of node input fields with validated request parameters
//! before the graph is submitted to ComfyUI.
//!
//! Templates are loaded fresh from disk for every request and never shared
//! between requests, so patching cannot corrupt concurrent submissions.

use std::path::{Path, PathBuf};

use comfygate_core::error::CoreError;
use serde_json::{json, Value};

/// ComfyUI's frame-based length field counts 8 frames per second of video.
/// Domain constant of the engine, not configuration.
pub const FRAMES_PER_SECOND: i64 = 8;

/// UNet checkpoint used by the image-to-video Wan 2.1 workflow (14B variant).
const WAN_I2V_MODEL: &str = "wan2.1_i2v_720p_14B_fp8_e4m3fn.safetensors";

/// UNet checkpoint used by the text-to-video Wan 2.1 workflow (1.3B variant).
const WAN_T2V_MODEL: &str = "wan2.1_t2v_1.3B_fp16.safetensors";

// ---------------------------------------------------------------------------
// Endpoint kinds
// ---------------------------------------------------------------------------

/// The generation operations exposed by the gateway.
///
/// Each kind selects a template file, a client tag (used by ComfyUI only
/// for its own bookkeeping), and a patch-rule table. Model-selection
/// fields are fixed per kind and never caller-controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    FluxTextToImage,
    WanImageToVideo,
    WanTextToVideo,
    FramepackImageToVideo,
}

impl EndpointKind {
    /// Name of the on-disk template this endpoint patches.
    pub fn template_name(self) -> &'static str {
        match self {
            EndpointKind::FluxTextToImage => "Flux API",
            EndpointKind::WanImageToVideo | EndpointKind::WanTextToVideo => "Wan 2.1 API",
            EndpointKind::FramepackImageToVideo => "FramePack API",
        }
    }

    /// Client tag sent to ComfyUI alongside the patched graph.
    pub fn client_tag(self) -> &'static str {
        match self {
            EndpointKind::FluxTextToImage => "flux_api",
            EndpointKind::WanImageToVideo => "wan_i2v_api",
            EndpointKind::WanTextToVideo => "wan_t2v_api",
            EndpointKind::FramepackImageToVideo => "framepack_api",
        }
    }

    /// Default resolution applied when the caller omits width/height.
    /// Framepack patches no resolution fields at all.
    fn default_dimensions(self) -> Option<(i64, i64)> {
        match self {
            EndpointKind::FluxTextToImage => Some((1024, 1024)),
            EndpointKind::WanImageToVideo | EndpointKind::WanTextToVideo => Some((512, 512)),
            EndpointKind::FramepackImageToVideo => None,
        }
    }

    /// Default video length in seconds, for video endpoints with a
    /// patchable length field.
    fn default_video_length_secs(self) -> Option<i64> {
        match self {
            EndpointKind::WanImageToVideo | EndpointKind::WanTextToVideo => Some(4),
            _ => None,
        }
    }

    /// Number of uploaded images this endpoint requires.
    fn required_images(self) -> usize {
        match self {
            EndpointKind::FluxTextToImage | EndpointKind::WanTextToVideo => 0,
            EndpointKind::WanImageToVideo => 1,
            EndpointKind::FramepackImageToVideo => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Request parameters
// ---------------------------------------------------------------------------

/// Caller-supplied generation parameters, shared by all endpoints.
///
/// Image fields hold the (already sanitized) filenames of uploaded source
/// images as they will appear in ComfyUI's input directory.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    pub prompt: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub video_length_secs: Option<i64>,
    /// Single source image (image-to-video), or start image (framepack).
    pub image: Option<String>,
    /// End image (framepack only).
    pub end_image: Option<String>,
}

impl GenerationParams {
    /// Validate parameters for an endpoint, before any template load, file
    /// write, or network call.
    pub fn validate(&self, kind: EndpointKind) -> Result<(), CoreError> {
        if self.prompt.trim().is_empty() {
            return Err(CoreError::Validation("prompt is required".into()));
        }

        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("video_length", self.video_length_secs),
        ] {
            if let Some(v) = value {
                if v <= 0 {
                    return Err(CoreError::Validation(format!(
                        "{name} must be a positive integer"
                    )));
                }
            }
        }

        let supplied = self.image.iter().chain(self.end_image.iter()).count();
        let required = kind.required_images();
        if supplied < required {
            return Err(CoreError::Validation(match kind {
                EndpointKind::FramepackImageToVideo => {
                    "Both start_image and end_image files are required".into()
                }
                _ => "No image file provided".into(),
            }));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Patch rules
// ---------------------------------------------------------------------------

/// One field assignment into the workflow graph:
/// `template[node].inputs[field] = value`.
#[derive(Debug, Clone)]
pub struct PatchRule {
    pub node: &'static str,
    pub field: &'static str,
    pub value: Value,
}

impl PatchRule {
    fn new(node: &'static str, field: &'static str, value: Value) -> Self {
        Self { node, field, value }
    }
}

/// Build the static patch-rule table for an endpoint from validated
/// parameters. Defaults are resolved here, so the returned table is the
/// complete set of writes the patcher will perform.
pub fn patch_rules(kind: EndpointKind, params: &GenerationParams) -> Vec<PatchRule> {
    let (width, height) = match kind.default_dimensions() {
        Some((dw, dh)) => (
            params.width.unwrap_or(dw),
            params.height.unwrap_or(dh),
        ),
        None => (0, 0),
    };

    let image = params.image.as_deref().unwrap_or_default();
    let end_image = params.end_image.as_deref().unwrap_or_default();

    match kind {
        EndpointKind::FluxTextToImage => vec![
            PatchRule::new("6", "text", json!(params.prompt)),
            PatchRule::new("33", "text", json!("")),
            PatchRule::new("27", "width", json!(width)),
            PatchRule::new("27", "height", json!(height)),
        ],
        EndpointKind::WanImageToVideo => {
            let frames = video_frames(kind, params);
            vec![
                PatchRule::new("37", "unet_name", json!(WAN_I2V_MODEL)),
                PatchRule::new("52", "image", json!(image)),
                PatchRule::new("6", "text", json!(params.prompt)),
                PatchRule::new("50", "width", json!(width)),
                PatchRule::new("50", "height", json!(height)),
                PatchRule::new("50", "length", json!(frames)),
            ]
        }
        EndpointKind::WanTextToVideo => {
            let frames = video_frames(kind, params);
            vec![
                PatchRule::new("37", "unet_name", json!(WAN_T2V_MODEL)),
                PatchRule::new("6", "text", json!(params.prompt)),
                PatchRule::new("7", "text", json!("")),
                PatchRule::new("50", "width", json!(width)),
                PatchRule::new("50", "height", json!(height)),
                PatchRule::new("50", "length", json!(frames)),
            ]
        }
        EndpointKind::FramepackImageToVideo => vec![
            PatchRule::new("19", "image", json!(image)),
            PatchRule::new("58", "image", json!(end_image)),
            PatchRule::new("47", "text", json!(params.prompt)),
        ],
    }
}

/// Convert the requested video length (or the endpoint default) to the
/// engine's frame count.
fn video_frames(kind: EndpointKind, params: &GenerationParams) -> i64 {
    let secs = params
        .video_length_secs
        .or(kind.default_video_length_secs())
        .unwrap_or(0);
    secs * FRAMES_PER_SECOND
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Errors from template loading and patching.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// No `<name>.json` file exists in the template directory.
    #[error("Workflow template '{0}' not found")]
    NotFound(String),

    /// The template file exists but is not a well-formed JSON object.
    #[error("Workflow template '{name}' is invalid: {reason}")]
    Invalid { name: String, reason: String },

    /// A patch rule referenced a node id absent from the loaded template.
    #[error("Workflow template has no node '{node}' (writing field '{field}')")]
    MissingNode {
        node: &'static str,
        field: &'static str,
    },
}

/// Loads workflow templates from a directory.
///
/// Every load deserializes a fresh copy, so callers can patch the result
/// without affecting other requests.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the store reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load `<dir>/<name>.json` as a workflow template.
    pub fn load(&self, name: &str) -> Result<WorkflowTemplate, TemplateError> {
        let path = self.dir.join(format!("{name}.json"));

        let raw = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TemplateError::NotFound(name.to_string())
            } else {
                TemplateError::Invalid {
                    name: name.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let value: Value = serde_json::from_str(&raw).map_err(|e| TemplateError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        match value {
            Value::Object(graph) => Ok(WorkflowTemplate { graph }),
            _ => Err(TemplateError::Invalid {
                name: name.to_string(),
                reason: "top-level value is not an object".into(),
            }),
        }
    }
}

/// A deserialized workflow graph: node id -> `{class_type, inputs}`.
#[derive(Debug, Clone)]
pub struct WorkflowTemplate {
    graph: serde_json::Map<String, Value>,
}

impl WorkflowTemplate {
    /// Apply a patch-rule table. Either every rule is written or the
    /// template is considered unusable -- a rule referencing a missing
    /// node fails the whole operation rather than silently no-op-ing.
    pub fn apply(&mut self, rules: &[PatchRule]) -> Result<(), TemplateError> {
        for rule in rules {
            let inputs = self
                .graph
                .get_mut(rule.node)
                .and_then(|node| node.get_mut("inputs"))
                .and_then(|inputs| inputs.as_object_mut())
                .ok_or(TemplateError::MissingNode {
                    node: rule.node,
                    field: rule.field,
                })?;

            inputs.insert(rule.field.to_string(), rule.value.clone());
        }
        Ok(())
    }

    /// Read back a patched input field (used by tests and diagnostics).
    pub fn input(&self, node: &str, field: &str) -> Option<&Value> {
        self.graph.get(node)?.get("inputs")?.get(field)
    }

    /// Consume the template into its JSON representation for submission.
    pub fn into_value(self) -> Value {
        Value::Object(self.graph)
    }
}

// ---------------------------------------------------------------------------
// Submission payload
// ---------------------------------------------------------------------------

/// The unit sent to ComfyUI's queueing endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmissionPayload {
    /// The patched workflow graph.
    pub prompt: Value,
    /// Endpoint-identifying client tag.
    pub client_id: &'static str,
}

/// Errors surfaced by [`patch`].
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// Caller-fixable parameter problem, detected before any side effect.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// Server-side template problem (missing file, malformed JSON,
    /// missing node).
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Patch contract: validate parameters, load the endpoint's template, and
/// apply its patch-rule table, producing the submission payload.
///
/// Validation failures are reported before the template is even loaded.
/// No partially patched template is ever returned.
pub fn patch(
    store: &TemplateStore,
    kind: EndpointKind,
    params: &GenerationParams,
) -> Result<SubmissionPayload, PatchError> {
    params.validate(kind)?;

    let mut template = store.load(kind.template_name())?;
    template.apply(&patch_rules(kind, params))?;

    Ok(SubmissionPayload {
        prompt: template.into_value(),
        client_id: kind.client_tag(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn params(prompt: &str) -> GenerationParams {
        GenerationParams {
            prompt: prompt.to_string(),
            ..Default::default()
        }
    }

    /// Minimal template carrying every node the patch tables reference.
    fn full_template() -> WorkflowTemplate {
        let value = serde_json::json!({
            "6":  { "class_type": "CLIPTextEncode", "inputs": { "text": "placeholder" } },
            "7":  { "class_type": "CLIPTextEncode", "inputs": { "text": "placeholder" } },
            "19": { "class_type": "LoadImage", "inputs": { "image": "a.png" } },
            "27": { "class_type": "EmptySD3LatentImage", "inputs": { "width": 0, "height": 0 } },
            "33": { "class_type": "CLIPTextEncode", "inputs": { "text": "placeholder" } },
            "37": { "class_type": "UNETLoader", "inputs": { "unet_name": "placeholder" } },
            "47": { "class_type": "CLIPTextEncode", "inputs": { "text": "placeholder" } },
            "50": { "class_type": "WanImageToVideo", "inputs": { "width": 0, "height": 0, "length": 0 } },
            "52": { "class_type": "LoadImage", "inputs": { "image": "a.png" } },
            "58": { "class_type": "LoadImage", "inputs": { "image": "a.png" } },
        });
        match value {
            Value::Object(graph) => WorkflowTemplate { graph },
            _ => unreachable!(),
        }
    }

    // -- Validation --------------------------------------------------------

    #[test]
    fn empty_prompt_is_rejected() {
        let p = params("   ");
        assert!(p.validate(EndpointKind::FluxTextToImage).is_err());
    }

    #[test]
    fn non_positive_dimensions_are_rejected() {
        let mut p = params("a cat");
        p.width = Some(0);
        assert!(p.validate(EndpointKind::FluxTextToImage).is_err());

        let mut p = params("a cat");
        p.height = Some(-5);
        assert!(p.validate(EndpointKind::FluxTextToImage).is_err());

        let mut p = params("a cat");
        p.video_length_secs = Some(0);
        assert!(p.validate(EndpointKind::WanTextToVideo).is_err());
    }

    #[test]
    fn image_endpoints_require_images() {
        let p = params("a cat");
        assert!(p.validate(EndpointKind::WanImageToVideo).is_err());
        assert!(p.validate(EndpointKind::FramepackImageToVideo).is_err());

        let mut p = params("a cat");
        p.image = Some("cat.png".into());
        assert!(p.validate(EndpointKind::WanImageToVideo).is_ok());
        // Framepack needs two.
        assert!(p.validate(EndpointKind::FramepackImageToVideo).is_err());
        p.end_image = Some("dog.png".into());
        assert!(p.validate(EndpointKind::FramepackImageToVideo).is_ok());
    }

    // -- Patch rules -------------------------------------------------------

    #[test]
    fn flux_patch_writes_supplied_dimensions() {
        let mut p = params("a castle");
        p.width = Some(768);
        p.height = Some(1344);

        let mut template = full_template();
        template
            .apply(&patch_rules(EndpointKind::FluxTextToImage, &p))
            .unwrap();

        assert_eq!(template.input("6", "text").unwrap(), "a castle");
        assert_eq!(template.input("33", "text").unwrap(), "");
        assert_eq!(template.input("27", "width").unwrap(), 768);
        assert_eq!(template.input("27", "height").unwrap(), 1344);
    }

    #[test]
    fn flux_patch_uses_1024_defaults() {
        let mut template = full_template();
        template
            .apply(&patch_rules(EndpointKind::FluxTextToImage, &params("x")))
            .unwrap();

        assert_eq!(template.input("27", "width").unwrap(), 1024);
        assert_eq!(template.input("27", "height").unwrap(), 1024);
    }

    #[test]
    fn wan_t2v_patch_selects_small_model_and_defaults() {
        let mut template = full_template();
        template
            .apply(&patch_rules(EndpointKind::WanTextToVideo, &params("x")))
            .unwrap();

        assert_eq!(template.input("37", "unet_name").unwrap(), WAN_T2V_MODEL);
        assert_eq!(template.input("50", "width").unwrap(), 512);
        assert_eq!(template.input("50", "height").unwrap(), 512);
        // Default 4 seconds at 8 fps.
        assert_eq!(template.input("50", "length").unwrap(), 32);
    }

    #[test]
    fn video_length_converts_seconds_to_frames() {
        for secs in [1i64, 2, 7, 30] {
            let mut p = params("x");
            p.image = Some("cat.png".into());
            p.video_length_secs = Some(secs);

            let mut template = full_template();
            template
                .apply(&patch_rules(EndpointKind::WanImageToVideo, &p))
                .unwrap();

            assert_eq!(
                template.input("50", "length").unwrap(),
                &json!(secs * FRAMES_PER_SECOND),
                "length for {secs}s"
            );
        }
    }

    #[test]
    fn wan_i2v_patch_selects_large_model_and_image() {
        let mut p = params("waves");
        p.image = Some("beach.jpg".into());

        let mut template = full_template();
        template
            .apply(&patch_rules(EndpointKind::WanImageToVideo, &p))
            .unwrap();

        assert_eq!(template.input("37", "unet_name").unwrap(), WAN_I2V_MODEL);
        assert_eq!(template.input("52", "image").unwrap(), "beach.jpg");
    }

    #[test]
    fn framepack_patch_writes_both_images() {
        let mut p = params("morph");
        p.image = Some("start.png".into());
        p.end_image = Some("end.png".into());

        let mut template = full_template();
        template
            .apply(&patch_rules(EndpointKind::FramepackImageToVideo, &p))
            .unwrap();

        assert_eq!(template.input("19", "image").unwrap(), "start.png");
        assert_eq!(template.input("58", "image").unwrap(), "end.png");
        assert_eq!(template.input("47", "text").unwrap(), "morph");
    }

    #[test]
    fn missing_node_fails_the_whole_patch() {
        let value = serde_json::json!({
            "6": { "class_type": "CLIPTextEncode", "inputs": { "text": "" } },
        });
        let mut template = match value {
            Value::Object(graph) => WorkflowTemplate { graph },
            _ => unreachable!(),
        };

        let err = template
            .apply(&patch_rules(EndpointKind::FluxTextToImage, &params("x")))
            .unwrap_err();
        assert!(matches!(err, TemplateError::MissingNode { .. }));
    }

    // -- Template store ----------------------------------------------------

    #[test]
    fn store_reports_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());
        let err = store.load("Flux API").unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));
    }

    #[test]
    fn store_reports_malformed_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Flux API.json"), "{ not json").unwrap();

        let store = TemplateStore::new(dir.path());
        let err = store.load("Flux API").unwrap_err();
        assert!(matches!(err, TemplateError::Invalid { .. }));
    }

    #[test]
    fn patch_contract_validates_before_loading() {
        // Empty prompt must fail even though the template dir is empty:
        // validation runs before any template load is attempted.
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());

        let err = patch(&store, EndpointKind::FluxTextToImage, &params("")).unwrap_err();
        assert!(matches!(err, PatchError::Validation(_)));
    }

    #[test]
    fn patch_contract_produces_tagged_payload() {
        let dir = tempfile::tempdir().unwrap();
        let template = serde_json::json!({
            "6":  { "class_type": "CLIPTextEncode", "inputs": { "text": "" } },
            "27": { "class_type": "EmptySD3LatentImage", "inputs": { "width": 0, "height": 0 } },
            "33": { "class_type": "CLIPTextEncode", "inputs": { "text": "" } },
        });
        std::fs::write(
            dir.path().join("Flux API.json"),
            serde_json::to_string(&template).unwrap(),
        )
        .unwrap();

        let store = TemplateStore::new(dir.path());
        let payload = patch(&store, EndpointKind::FluxTextToImage, &params("a fox")).unwrap();

        assert_eq!(payload.client_id, "flux_api");
        assert_eq!(payload.prompt["6"]["inputs"]["text"], "a fox");
        assert_eq!(payload.prompt["27"]["inputs"]["width"], 1024);
    }
}
