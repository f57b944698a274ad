use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod tokens;

pub use extractors::{require_auth, AuthUser};

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}

pub fn session_router() -> Router<AppState> {
    handlers::session_routes()
}
