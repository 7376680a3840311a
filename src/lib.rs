//! Parent Dashboard Sync
//!
//! Polling client for the Amazon Parent Dashboard. The dashboard has no
//! public API, so the service borrows a browser session (cookies plus the
//! anti-forgery token) captured by a companion service and keeps it alive
//! across silent expirations.
//!
//! # Architecture
//!
//! - [`store`]: AES-256-GCM encrypted cache of the last known cookies
//! - [`auth`]: credential sources (companion, store) walked in priority order
//! - [`client`]: upstream calls with a typed failure classification
//! - [`session`]: session state and the refresh coordinator that owns it
//! - [`server`]: local status and control endpoints
//!
//! When an upstream call reports an expired session, the coordinator
//! re-acquires credentials once and retries the call once. If that fails it
//! raises a single persistent notification asking for manual
//! re-authentication, and clears it after the next successful cycle.
//!
//! # Examples
//!
//! ```rust,no_run
//! use parent_dashboard_sync::{RefreshCoordinator, Settings};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::default();
//! let coordinator = RefreshCoordinator::from_settings(&settings)?;
//! let snapshot = coordinator.run_cycle().await?;
//! println!("{} children", snapshot.children().count());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod store;
pub mod types;
pub mod utils;

pub use config::{ConfigLoader, Settings};
pub use error::{Error, Result};
pub use session::{CoordinatorState, CoordinatorStatus, RefreshCoordinator, SessionState};
pub use types::{CredentialSet, DashboardSnapshot, ErrorResponse, PingResponse};
