//! HTTP request handlers, one module per resource.

pub mod api_keys;
pub mod auth;
pub mod download;
pub mod generation;
pub mod status;
pub mod users;
