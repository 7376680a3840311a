//! Error handling for the dashboard client
//!
//! This module defines the closed error taxonomy used throughout the crate.

pub mod formatting;
pub mod types;

pub use formatting::{format_error, format_error_for_api, format_error_for_logging};
pub use types::{AcquisitionError, Error, Result, StorageError};
