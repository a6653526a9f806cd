//! ComfyUI workflow patching and job relay.
//!
//! Provides the template patcher (load a workflow-graph template, apply an
//! endpoint-specific patch-rule table), the REST relay (submit workflows,
//! poll job history), status interpretation, and output file resolution.

pub mod api;
pub mod outputs;
pub mod status;
pub mod workflow;
