//! Utility functions and helpers
//!
//! This module contains utility functions used throughout the application.

pub mod paths;
pub mod version;

pub use version::{VERSION, get_version, service_user_agent};
