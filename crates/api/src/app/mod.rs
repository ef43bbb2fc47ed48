//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, seeding, health probes
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and extraction helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: AppServices) -> Router {
    let services = Arc::new(services);

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/ping", get(routes::system::ping))
        .route("/health/db", get(routes::system::db_health))
        .route("/health/redis", get(routes::system::redis_health))
        .nest("/api/v1", routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_log))
                .layer(Extension(services)),
        )
}
