mod api_key_repo;
mod session_repo;
mod user_repo;

pub use api_key_repo::ApiKeyRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
