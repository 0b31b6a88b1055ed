//! API Module
//!
//! HTTP API layer for the server.

pub mod error;
pub mod health;
pub mod job;
pub mod stubs;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::service::JobService;

/// Create the main API router with all endpoints
pub fn create_router(service: JobService) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/stubs", get(stubs::get_stubs))
        // Script endpoints
        .route("/api/scripts", get(job::list_scripts))
        .route("/api/scripts/execute", post(job::execute_script))
        .route("/api/scripts/cleanup", delete(job::cleanup_scripts))
        .route("/api/scripts/{id}", get(job::get_script))
        .route("/api/scripts/{id}/stop", post(job::stop_script))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}
