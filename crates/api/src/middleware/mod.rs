//! Request extractors enforcing authentication and authorization.

pub mod api_key;
pub mod auth;
pub mod rbac;
