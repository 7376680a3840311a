//! # Refresh Coordinator
//!
//! Owns the poll loop and the only code path that reacts to an expired
//! session. Every upstream call made by the service goes through
//! [`RefreshCoordinator`], which guarantees:
//!
//! - at most one credential refresh and one retry per cycle or action,
//! - at most one re-authentication alert per failure episode,
//! - the alert is dismissed by the first fully successful cycle after it,
//! - no cycle overlaps another one.
//!
//! ## States
//!
//! ```text
//!            tick
//!   Idle ─────────────▶ Polling ───── ok ─────────────────────▶ Idle
//!    ▲                     │
//!    │                     ├── network / parse error ─────────▶ Idle (surfaced)
//!    │                     │
//!    │                     └── session expired / no creds
//!    │                               │
//!    │                               ▼
//!    │                          Refreshing ── exhausted ──┐
//!    │                               │                    │
//!    │                               ▼                    ▼
//!    └──────────── ok ────────  RetryingFetch ── err ──▶ Failed(notified)
//! ```
//!
//! `Failed` is not permanent. The next tick starts from `Polling` again and
//! attempts a fresh refresh; only the alert is not repeated.

use crate::auth::{CookieProvider, CredentialProvider};
use crate::client::{DashboardApi, DashboardClient};
use crate::config::Settings;
use crate::config::settings::CoordinatorSettings;
use crate::error::format_error_for_logging;
use crate::session::notify::{NotificationSink, REAUTH_MESSAGE, REAUTH_TITLE, sink_from_settings};
use crate::session::state::SessionState;
use crate::types::DashboardSnapshot;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Where the coordinator currently is in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CoordinatorState {
    Idle,
    Polling,
    Refreshing,
    RetryingFetch,
    Failed {
        /// Whether the re-authentication alert is out
        notified: bool,
    },
}

/// Alert bookkeeping carried from one cycle to the next
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RefreshAttempt {
    /// Set once the alert has been sent and not yet cleared
    notification_sent: bool,
}

/// State only touched by whoever holds the cycle guard
#[derive(Debug, Default)]
struct Guarded {
    session: SessionState,
    attempt: RefreshAttempt,
}

/// Snapshot of the coordinator for the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStatus {
    #[serde(flatten)]
    pub state: CoordinatorState,
    pub authenticated: bool,
    pub generation: u64,
    pub notification_sent: bool,
    pub credential_source: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<serde_json::Value>,
    pub consecutive_failures: u32,
    pub snapshot: Option<DashboardSnapshot>,
}

impl Default for CoordinatorStatus {
    fn default() -> Self {
        Self {
            state: CoordinatorState::Idle,
            authenticated: false,
            generation: 0,
            notification_sent: false,
            credential_source: None,
            last_success: None,
            last_error: None,
            consecutive_failures: 0,
            snapshot: None,
        }
    }
}

/// Unit of upstream work run under the refresh-once policy
enum Operation<'a> {
    Poll,
    SetPause {
        child_ids: &'a [String],
        duration_secs: u64,
    },
}

enum Outcome {
    Snapshot(DashboardSnapshot),
    Applied,
}

/// How a guarded run ended when it did not succeed
enum RunError {
    /// Not an authentication problem; reported without refresh or alert
    Surfaced(Error),
    /// The refresh-and-retry sequence could not recover
    Failed(Error),
}

/// Periodic poller with bounded session recovery
pub struct RefreshCoordinator {
    api: Arc<dyn DashboardApi>,
    provider: Arc<dyn CredentialProvider>,
    sink: Arc<dyn NotificationSink>,
    settings: CoordinatorSettings,
    guarded: Mutex<Guarded>,
    status: RwLock<CoordinatorStatus>,
    shutdown_tx: watch::Sender<bool>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        provider: Arc<dyn CredentialProvider>,
        sink: Arc<dyn NotificationSink>,
        settings: CoordinatorSettings,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            api,
            provider,
            sink,
            settings,
            guarded: Mutex::new(Guarded::default()),
            status: RwLock::new(CoordinatorStatus::default()),
            shutdown_tx,
            task: std::sync::Mutex::new(None),
        }
    }

    /// Wire the HTTP client, the cookie provider and the notification sink
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api = Arc::new(DashboardClient::new(&settings.upstream)?);
        let provider = Arc::new(CookieProvider::from_settings(settings)?);
        let sink = sink_from_settings(&settings.notify)?;
        Ok(Self::new(api, provider, sink, settings.coordinator.clone()))
    }

    /// Seed the session, e.g. with credentials loaded at startup
    pub fn with_session(self, session: SessionState) -> Self {
        Self {
            guarded: Mutex::new(Guarded {
                session,
                attempt: RefreshAttempt::default(),
            }),
            ..self
        }
    }

    /// Run one poll cycle now
    ///
    /// Fails with [`Error::CycleInProgress`] instead of waiting when another
    /// cycle holds the guard. A cycle that could not recover from an expired
    /// session fails with [`Error::ReauthRequired`].
    pub async fn run_cycle(&self) -> Result<DashboardSnapshot> {
        let mut guarded = self
            .guarded
            .try_lock()
            .map_err(|_| Error::CycleInProgress)?;

        let result = self.drive(&mut guarded, Operation::Poll).await;

        match result {
            Ok(Outcome::Snapshot(snapshot)) => {
                self.on_cycle_success(&mut guarded, &snapshot).await;
                Ok(snapshot)
            }
            Ok(Outcome::Applied) => Err(Error::internal("poll produced no snapshot")),
            Err(RunError::Surfaced(e)) => {
                self.transition(CoordinatorState::Idle).await;
                self.record_failure(&guarded, &e).await;
                Err(e)
            }
            Err(RunError::Failed(cause)) => {
                self.on_cycle_failed(&mut guarded, &cause).await;
                let e = Error::reauth_required(cause);
                self.record_failure(&guarded, &e).await;
                Err(e)
            }
        }
    }

    /// Suspend screen-time limits for one child
    pub async fn pause_limits(&self, child_id: &str, duration_secs: u64) -> Result<()> {
        self.apply_pause(&[child_id.to_string()], duration_secs).await
    }

    /// Lift a pause for one child
    pub async fn resume_limits(&self, child_id: &str) -> Result<()> {
        self.apply_pause(&[child_id.to_string()], 0).await
    }

    /// Actions wait for a running cycle and share its recovery policy, but
    /// leave the alert alone.
    async fn apply_pause(&self, child_ids: &[String], duration_secs: u64) -> Result<()> {
        let mut guarded = self.guarded.lock().await;
        let operation = Operation::SetPause {
            child_ids,
            duration_secs,
        };

        match self.drive(&mut guarded, operation).await {
            Ok(_) => {
                self.transition(CoordinatorState::Idle).await;
                self.publish_session(&guarded).await;
                info!(
                    "Applied {}s off-screen time to {} children",
                    duration_secs,
                    child_ids.len()
                );
                Ok(())
            }
            Err(RunError::Surfaced(e)) => {
                self.transition(CoordinatorState::Idle).await;
                Err(e)
            }
            Err(RunError::Failed(cause)) => {
                self.transition(CoordinatorState::Failed {
                    notified: guarded.attempt.notification_sent,
                })
                .await;
                self.publish_session(&guarded).await;
                Err(Error::reauth_required(cause))
            }
        }
    }

    /// Polling → (Refreshing → RetryingFetch) for one operation
    async fn drive(
        &self,
        guarded: &mut Guarded,
        operation: Operation<'_>,
    ) -> std::result::Result<Outcome, RunError> {
        let session = &mut guarded.session;
        self.transition(CoordinatorState::Polling).await;

        // Scoped to this call so a cycle dropped mid-refresh cannot leak it
        let mut is_retrying = false;
        loop {
            let result = if session.is_authenticated() {
                self.execute(session, &operation).await
            } else {
                Err(Error::not_authenticated(
                    session
                        .current()
                        .unusable_reason()
                        .unwrap_or("no credentials loaded"),
                ))
            };

            let error = match result {
                Ok(outcome) => return Ok(outcome),
                Err(e) if is_retrying => {
                    error!("Retry after refresh failed: {}", e);
                    return Err(RunError::Failed(e));
                }
                Err(e) if e.needs_refresh() => e,
                Err(e) => {
                    warn!("Upstream call failed without refresh: {}", e);
                    return Err(RunError::Surfaced(e));
                }
            };

            info!("Refreshing credentials: {}", error);
            is_retrying = true;
            self.transition(CoordinatorState::Refreshing).await;

            let credentials = match self.provider.acquire().await {
                Ok(credentials) => credentials,
                Err(e) => {
                    error!("Could not acquire new credentials: {}", e);
                    session.clear();
                    return Err(RunError::Failed(e));
                }
            };

            let source = credentials.source().to_string();
            let generation = session.replace(credentials);
            info!(
                "Loaded credentials from {} (generation {})",
                source, generation
            );
            self.transition(CoordinatorState::RetryingFetch).await;
        }
    }

    async fn execute(
        &self,
        session: &SessionState,
        operation: &Operation<'_>,
    ) -> Result<Outcome> {
        match operation {
            Operation::Poll => self.fetch_snapshot(session).await.map(Outcome::Snapshot),
            Operation::SetPause {
                child_ids,
                duration_secs,
            } => self
                .api
                .set_pause(session, child_ids, *duration_secs)
                .await
                .map(|_| Outcome::Applied),
        }
    }

    /// Household, then devices, then each child's limits
    async fn fetch_snapshot(&self, session: &SessionState) -> Result<DashboardSnapshot> {
        let members = self.api.fetch_household(session).await?;
        let devices = self.api.fetch_devices(session).await?;

        let mut schedules = BTreeMap::new();
        for child in members.iter().filter(|m| m.is_child()) {
            let schedule = self
                .api
                .fetch_time_limits(session, &child.directed_id)
                .await?;
            schedules.insert(child.directed_id.clone(), schedule);
        }

        Ok(DashboardSnapshot {
            members,
            devices,
            schedules,
            fetched_at: Utc::now(),
            generation: session.generation(),
        })
    }

    async fn on_cycle_success(&self, guarded: &mut Guarded, snapshot: &DashboardSnapshot) {
        if guarded.attempt.notification_sent {
            if let Err(e) = self.sink.clear(&self.settings.notification_id).await {
                warn!("Failed to clear re-authentication notification: {}", e);
            }
            guarded.attempt.notification_sent = false;
            info!("Session recovered, notification cleared");
        }

        self.transition(CoordinatorState::Idle).await;

        let mut status = self.status.write().await;
        status.authenticated = guarded.session.is_authenticated();
        status.generation = guarded.session.generation();
        status.credential_source = Some(guarded.session.current().source().to_string());
        status.notification_sent = false;
        status.last_success = Some(snapshot.fetched_at);
        status.last_error = None;
        status.consecutive_failures = 0;
        status.snapshot = Some(snapshot.clone());
        debug!(
            "Cycle complete: {} members, {} devices",
            snapshot.members.len(),
            snapshot.devices.len()
        );
    }

    async fn on_cycle_failed(&self, guarded: &mut Guarded, cause: &Error) {
        if guarded.attempt.notification_sent {
            debug!("Re-authentication notification already sent");
        } else {
            match self
                .sink
                .notify(REAUTH_TITLE, REAUTH_MESSAGE, &self.settings.notification_id)
                .await
            {
                Ok(()) => {
                    guarded.attempt.notification_sent = true;
                    warn!("Manual re-authentication required: {}", cause);
                }
                Err(e) => error!("Failed to send re-authentication notification: {}", e),
            }
        }

        self.transition(CoordinatorState::Failed {
            notified: guarded.attempt.notification_sent,
        })
        .await;
    }

    async fn record_failure(&self, guarded: &Guarded, error: &Error) {
        let mut status = self.status.write().await;
        status.authenticated = guarded.session.is_authenticated();
        status.generation = guarded.session.generation();
        status.notification_sent = guarded.attempt.notification_sent;
        status.last_error = Some(format_error_for_logging(error));
        status.consecutive_failures = status.consecutive_failures.saturating_add(1);
    }

    async fn publish_session(&self, guarded: &Guarded) {
        let mut status = self.status.write().await;
        status.authenticated = guarded.session.is_authenticated();
        status.generation = guarded.session.generation();
        if guarded.session.is_authenticated() {
            status.credential_source = Some(guarded.session.current().source().to_string());
        }
    }

    async fn transition(&self, next: CoordinatorState) {
        let mut status = self.status.write().await;
        if status.state != next {
            debug!("Coordinator {:?} -> {:?}", status.state, next);
            status.state = next;
        }
    }

    pub async fn status(&self) -> CoordinatorStatus {
        self.status.read().await.clone()
    }

    pub async fn state(&self) -> CoordinatorState {
        self.status.read().await.state
    }

    /// Spawn the periodic poll loop
    ///
    /// The first tick fires immediately. Calling `start` on a running or
    /// shut-down coordinator does nothing.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() {
            warn!("Poll loop already running");
            return;
        }
        if *self.shutdown_tx.borrow() {
            warn!("Coordinator was shut down, not starting poll loop");
            return;
        }

        let this = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = self.settings.update_interval();

        *task = Some(tokio::spawn(async move {
            info!("Poll loop started, interval {:?}", interval);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match this.run_cycle().await {
                            Ok(_) => {}
                            Err(Error::CycleInProgress) => debug!("Skipping tick, cycle in progress"),
                            Err(e) => warn!("Poll cycle failed: {}", e),
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!("Poll loop stopped");
        }));
    }

    /// Stop the poll loop
    ///
    /// No new tick starts after this is called. An in-flight cycle gets the
    /// configured grace period to finish before it is aborted. Safe to call
    /// more than once.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);

        let handle = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        let Some(mut handle) = handle else {
            return;
        };

        let grace = self.settings.shutdown_grace();
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => debug!("Poll loop exited cleanly"),
            Ok(Err(e)) => warn!("Poll loop ended abnormally: {}", e),
            Err(_) => {
                warn!("Poll loop did not stop within {:?}, aborting", grace);
                handle.abort();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}
