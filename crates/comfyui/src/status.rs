//! Interpretation of ComfyUI history records.
//!
//! The history endpoint returns a mapping keyed by job id:
//!
//! ```text
//! { "<job_id>": {
//!     "status": { "status_str": "success", ... },
//!     "outputs": { "<node_id>": { "images": [ { "filename": ... } ],
//!                                 "gifs":   [ ... ] } } } }
//! ```
//!
//! The gateway's status vocabulary is deliberately small: a job is
//! `Succeeded` only when the record's `status_str` is exactly `"success"`.
//! Everything else -- record absent, status field missing, still running,
//! or failed -- reports as `Queued` and the caller polls again. This
//! preserves the external contract; see DESIGN.md for the open-question
//! decision on failed jobs.

use serde_json::Value;

/// Derived job state, produced per poll. Never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// No success record yet. Covers pending, running, and failed jobs.
    Queued,
    /// The engine reported success.
    Succeeded {
        /// Raw per-node outputs object, relayed to the caller.
        outputs: Value,
        /// First output filename found, if any.
        file_name: Option<String>,
    },
}

/// Interpret a history response for a job id.
pub fn interpret_history(job_id: &str, history: &Value) -> JobStatus {
    let Some(record) = history.get(job_id) else {
        return JobStatus::Queued;
    };

    let status_str = record
        .get("status")
        .and_then(|s| s.get("status_str"))
        .and_then(|s| s.as_str());

    if status_str != Some("success") {
        return JobStatus::Queued;
    }

    let outputs = record.get("outputs").cloned().unwrap_or(Value::Null);
    let file_name = first_output_filename(&outputs);

    JobStatus::Succeeded { outputs, file_name }
}

/// Scan per-node outputs for the first produced filename.
///
/// Nodes are visited in map iteration order; within a node, an `images`
/// list is preferred over a `gifs` list. The first node exposing either
/// wins and any further outputs are ignored.
fn first_output_filename(outputs: &Value) -> Option<String> {
    let nodes = outputs.as_object()?;

    for node_output in nodes.values() {
        for kind in ["images", "gifs"] {
            if let Some(first) = node_output
                .get(kind)
                .and_then(|list| list.as_array())
                .and_then(|list| list.first())
            {
                if let Some(name) = first.get("filename").and_then(|f| f.as_str()) {
                    return Some(name.to_string());
                }
            }
        }
        // A node with outputs but no recognized media list does not stop
        // the scan; later nodes may still carry the file.
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_record_is_queued() {
        let history = json!({});
        assert_eq!(interpret_history("abc", &history), JobStatus::Queued);
    }

    #[test]
    fn missing_status_field_is_queued() {
        let history = json!({ "abc": { "outputs": {} } });
        assert_eq!(interpret_history("abc", &history), JobStatus::Queued);
    }

    #[test]
    fn non_success_status_is_queued() {
        for status in ["error", "running", "pending"] {
            let history = json!({ "abc": { "status": { "status_str": status } } });
            assert_eq!(
                interpret_history("abc", &history),
                JobStatus::Queued,
                "status_str={status}"
            );
        }
    }

    #[test]
    fn success_with_images_yields_first_filename() {
        let history = json!({
            "abc": {
                "status": { "status_str": "success" },
                "outputs": {
                    "9": { "images": [
                        { "filename": "ComfyUI_00001_.png", "type": "output" },
                        { "filename": "ComfyUI_00002_.png", "type": "output" }
                    ] }
                }
            }
        });

        match interpret_history("abc", &history) {
            JobStatus::Succeeded { file_name, outputs } => {
                assert_eq!(file_name.as_deref(), Some("ComfyUI_00001_.png"));
                assert!(outputs.get("9").is_some());
            }
            other => panic!("expected Succeeded, got {other:?}"),
        }
    }

    #[test]
    fn success_with_gifs_falls_back_to_gif_filename() {
        let history = json!({
            "abc": {
                "status": { "status_str": "success" },
                "outputs": {
                    "30": { "gifs": [ { "filename": "animation.mp4" } ] }
                }
            }
        });

        match interpret_history("abc", &history) {
            JobStatus::Succeeded { file_name, .. } => {
                assert_eq!(file_name.as_deref(), Some("animation.mp4"));
            }
            other => panic!("expected Succeeded, got {other:?}"),
        }
    }

    #[test]
    fn images_win_over_gifs_within_a_node() {
        let history = json!({
            "abc": {
                "status": { "status_str": "success" },
                "outputs": {
                    "9": {
                        "gifs":   [ { "filename": "clip.mp4" } ],
                        "images": [ { "filename": "frame.png" } ]
                    }
                }
            }
        });

        match interpret_history("abc", &history) {
            JobStatus::Succeeded { file_name, .. } => {
                assert_eq!(file_name.as_deref(), Some("frame.png"));
            }
            other => panic!("expected Succeeded, got {other:?}"),
        }
    }

    #[test]
    fn success_without_outputs_has_no_filename() {
        let history = json!({
            "abc": { "status": { "status_str": "success" }, "outputs": {} }
        });

        match interpret_history("abc", &history) {
            JobStatus::Succeeded { file_name, .. } => assert_eq!(file_name, None),
            other => panic!("expected Succeeded, got {other:?}"),
        }
    }

    #[test]
    fn nodes_without_media_lists_are_skipped() {
        let history = json!({
            "abc": {
                "status": { "status_str": "success" },
                "outputs": {
                    "5": { "latents": [ { "filename": "ignored.latent" } ] },
                    "9": { "images":  [ { "filename": "kept.png" } ] }
                }
            }
        });

        match interpret_history("abc", &history) {
            JobStatus::Succeeded { file_name, .. } => {
                assert_eq!(file_name.as_deref(), Some("kept.png"));
            }
            other => panic!("expected Succeeded, got {other:?}"),
        }
    }
}
