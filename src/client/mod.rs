//! Remote API client
//!
//! Calls the parent dashboard's ajax endpoints and classifies failures.

pub mod api;
pub mod network;

pub use api::{DashboardApi, DashboardClient};
