//! Domain utilities shared by every comfygate crate.
//!
//! Zero internal dependencies: error taxonomy, id/timestamp aliases,
//! API key material generation, and media file helpers.

pub mod api_keys;
pub mod error;
pub mod media;
pub mod roles;
pub mod types;
