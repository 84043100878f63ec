use axum::{Router, routing::get};

pub mod search;
pub mod system;

/// Router for all endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/search", search::router())
}
