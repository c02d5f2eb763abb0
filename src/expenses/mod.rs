use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod summary;

pub fn router() -> Router<AppState> {
    handlers::expense_routes()
}
