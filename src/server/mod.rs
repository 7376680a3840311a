//! HTTP server implementation
//!
//! Local status and control surface for the coordinator, built on Axum.

pub mod app;
pub mod handlers;

pub use app::{AppState, create_app};
