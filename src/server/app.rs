//! Axum application setup
//!
//! Creates and configures the Axum application with routes and middleware.

use crate::session::RefreshCoordinator;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Coordinator that owns the session and the poll loop
    pub coordinator: Arc<RefreshCoordinator>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

/// Create the status/control router around a coordinator
pub fn create_app(coordinator: Arc<RefreshCoordinator>) -> Router {
    let state = AppState {
        coordinator,
        start_time: std::time::Instant::now(),
    };

    Router::new()
        .route("/ping", get(super::handlers::ping))
        .route("/status", get(super::handlers::status))
        .route("/refresh", post(super::handlers::refresh))
        .route("/children/{id}/pause", post(super::handlers::pause))
        .route("/children/{id}/resume", post(super::handlers::resume))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
