//! Parent dashboard API client
//!
//! One method per upstream operation. Every call reads the credentials from
//! the [`SessionState`] it is handed and never modifies it; recovering from
//! an expired session is the coordinator's job.

use crate::client::network::{build_client, classify_status, classify_transport};
use crate::config::settings::UpstreamSettings;
use crate::session::SessionState;
use crate::types::{ChildSchedule, DaySchedule, Device, HouseholdMember};
use crate::{Error, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub const OP_GET_HOUSEHOLD: &str = "get-household";
pub const OP_GET_DEVICES: &str = "get-child-devices";
pub const OP_GET_TIME_LIMITS: &str = "get-adjusted-time-limits";
pub const OP_SET_OFFSCREEN_TIME: &str = "set-offscreen-time";

const CSRF_HEADER: &str = "x-amzn-csrf";

/// Upstream operations the poll cycle and the control actions need
#[async_trait::async_trait]
pub trait DashboardApi: Send + Sync {
    async fn fetch_household(&self, session: &SessionState) -> Result<Vec<HouseholdMember>>;

    async fn fetch_devices(&self, session: &SessionState) -> Result<Vec<Device>>;

    async fn fetch_time_limits(
        &self,
        session: &SessionState,
        child_id: &str,
    ) -> Result<ChildSchedule>;

    /// Suspend limits for `child_ids`; a duration of 0 resumes them
    async fn set_pause(
        &self,
        session: &SessionState,
        child_ids: &[String],
        duration_secs: u64,
    ) -> Result<()>;
}

#[derive(Deserialize)]
struct HouseholdEnvelope {
    #[serde(default)]
    members: Vec<HouseholdMember>,
}

#[derive(Deserialize)]
struct DevicesEnvelope {
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeLimitsEnvelope {
    #[serde(default)]
    period_configurations: Vec<DaySchedule>,
}

/// HTTP implementation of [`DashboardApi`]
#[derive(Debug, Clone)]
pub struct DashboardClient {
    client: Client,
    base_url: String,
    settings: UpstreamSettings,
}

impl DashboardClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            settings: settings.clone(),
        })
    }

    fn url(&self, operation: &str) -> String {
        format!("{}/{}", self.base_url, operation)
    }

    /// Attach credentials and the browser-like headers the dashboard expects
    fn authorize(&self, request: RequestBuilder, session: &SessionState) -> Result<RequestBuilder> {
        let credentials = session.current();
        let token = match credentials.csrf_token() {
            Some(token) if session.is_authenticated() => token,
            _ => {
                return Err(Error::not_authenticated(
                    credentials.unusable_reason().unwrap_or("no credentials loaded"),
                ));
            }
        };

        Ok(request
            .header(COOKIE, credentials.cookie_header())
            .header(CSRF_HEADER, token)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(REFERER, &self.settings.referer))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        session: &SessionState,
        operation: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let request = self.authorize(self.client.get(self.url(operation)), session)?;

        let response = request
            .query(query)
            .send()
            .await
            .map_err(|e| classify_transport(e, operation))?;

        classify_status(response.status(), operation)?;

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport(e, operation))?;

        serde_json::from_slice(&body).map_err(|e| Error::parse(operation, e.to_string()))
    }
}

#[async_trait::async_trait]
impl DashboardApi for DashboardClient {
    async fn fetch_household(&self, session: &SessionState) -> Result<Vec<HouseholdMember>> {
        let envelope: HouseholdEnvelope = self.get_json(session, OP_GET_HOUSEHOLD, &[]).await?;
        debug!("Retrieved {} household members", envelope.members.len());
        Ok(envelope.members)
    }

    async fn fetch_devices(&self, session: &SessionState) -> Result<Vec<Device>> {
        let envelope: DevicesEnvelope = self.get_json(session, OP_GET_DEVICES, &[]).await?;
        debug!("Retrieved {} devices", envelope.devices.len());
        Ok(envelope.devices)
    }

    async fn fetch_time_limits(
        &self,
        session: &SessionState,
        child_id: &str,
    ) -> Result<ChildSchedule> {
        let envelope: TimeLimitsEnvelope = self
            .get_json(session, OP_GET_TIME_LIMITS, &[("childDirectedId", child_id)])
            .await?;
        debug!(
            "Retrieved {} schedule periods for child {}",
            envelope.period_configurations.len(),
            child_id
        );
        Ok(ChildSchedule {
            child_directed_id: child_id.to_string(),
            period_configurations: envelope.period_configurations,
        })
    }

    async fn set_pause(
        &self,
        session: &SessionState,
        child_ids: &[String],
        duration_secs: u64,
    ) -> Result<()> {
        let body = serde_json::json!({
            "directedIds": child_ids,
            "expirationTimeInSeconds": duration_secs,
        });

        let request = self
            .authorize(self.client.post(self.url(OP_SET_OFFSCREEN_TIME)), session)?
            .header(ORIGIN, &self.settings.origin)
            .header(CONTENT_TYPE, "application/json;charset=UTF-8")
            .body(body.to_string());

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(e, OP_SET_OFFSCREEN_TIME))?;

        classify_status(response.status(), OP_SET_OFFSCREEN_TIME)?;

        debug!(
            "Set off-screen time of {}s for {} children",
            duration_secs,
            child_ids.len()
        );
        Ok(())
    }
}
