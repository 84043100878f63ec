//! HTTP API application wiring (Axum router + service wiring).
//!
//! Structured as:
//! - `services.rs`: infrastructure wiring (transport, intake, reader, the
//!   dev-mode in-process worker)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request DTOs and the response envelope
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: services::AppConfig) -> Router {
    let services = Arc::new(services::build_services(config));
    routes::router().layer(Extension(services))
}
