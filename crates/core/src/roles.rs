//! Role name constants shared by the auth layer and user management.

/// Full administrative access: user and API key management.
pub const ROLE_ADMIN: &str = "admin";

/// Regular authenticated user of the administrative UI.
pub const ROLE_USER: &str = "user";
