pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
mod services;

use crate::state::AppState;
use axum::Router;

/// All article routes; every one sits behind the auth gate.
pub fn router() -> Router<AppState> {
    handlers::routes()
}
