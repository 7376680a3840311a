//! Session lifecycle
//!
//! In-memory session state, the refresh coordinator that owns it, and the
//! notification sinks it reports unrecoverable failures to.

pub mod coordinator;
pub mod notify;
pub mod state;

pub use coordinator::{CoordinatorState, CoordinatorStatus, RefreshCoordinator};
pub use notify::{HomeAssistantSink, LogNotificationSink, NotificationSink};
pub use state::SessionState;
