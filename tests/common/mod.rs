//! Common test utilities and helpers
//!
//! Mock upstream and companion servers plus settings pointed at them.

#![allow(dead_code)]

use parent_dashboard_sync::{
    config::Settings,
    store::CredentialStore,
    types::{CookiePayload, RawCookie},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CSRF_COOKIE: &str = "ft-panda-csrf-token";

/// Cookie export holding a session cookie and the anti-forgery token
pub fn usable_payload(session_id: &str, token: &str) -> CookiePayload {
    CookiePayload::new(vec![
        RawCookie::new("session-id", session_id),
        RawCookie::new(CSRF_COOKIE, token),
    ])
}

/// The companion's `/api/cookies` body
pub fn cookies_body(session_id: &str, token: &str) -> Value {
    json!({
        "cookies": [
            {"name": "session-id", "value": session_id, "domain": ".amazon.com", "path": "/"},
            {"name": CSRF_COOKIE, "value": token, "domain": ".amazon.com", "path": "/"}
        ],
        "timestamp": "2024-05-01T10:00:00",
        "version": "1.0"
    })
}

pub fn household_body() -> Value {
    json!({
        "members": [
            {"directedId": "adult-1", "role": "ADULT", "firstName": "Alex"},
            {"directedId": "child-1", "role": "CHILD", "firstName": "Robin"}
        ]
    })
}

pub fn devices_body() -> Value {
    json!({
        "devices": [
            {
                "deviceId": "dev-1",
                "deviceTypeId": "A2M4YX06LWP8WI",
                "deviceName": "Robin's Fire",
                "deviceSettings": {"childDirectedId": "child-1"},
                "multiModal": true
            }
        ]
    })
}

pub fn time_limits_body() -> Value {
    json!({
        "periodConfigurations": [
            {
                "type": "DayOfWeek",
                "name": "Monday",
                "enabled": true,
                "timeLimits": {"contentTimeLimitsEnabled": true, "contentTimeLimits": {"ALL": 90}}
            }
        ]
    })
}

/// Mount the three read endpoints answering for `token`
pub async fn mount_dashboard(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/get-household"))
        .and(header("x-amzn-csrf", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(household_body()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get-child-devices"))
        .and(header("x-amzn-csrf", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices_body()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get-adjusted-time-limits"))
        .and(header("x-amzn-csrf", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(time_limits_body()))
        .mount(server)
        .await;
}

/// Settings aimed at the mock servers with the store in `store_dir`
pub fn test_settings(upstream: &MockServer, companion_url: &str, store_dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.upstream.base_url = upstream.uri();
    settings.upstream.request_timeout_secs = 2;
    settings.upstream.connect_timeout_secs = 1;
    settings.companion.base_url = companion_url.to_string();
    settings.companion.timeout_secs = 1;
    settings.store.dir = store_dir.path().to_path_buf();
    settings.coordinator.update_interval_secs = 1;
    settings.coordinator.shutdown_grace_secs = 1;
    settings
}

/// Seal `payload` into the store described by `settings`
pub fn seed_store(settings: &Settings, payload: &CookiePayload) -> CredentialStore {
    let store = CredentialStore::from_settings(&settings.store).unwrap();
    store.save_payload(payload).unwrap();
    store
}

/// Address nothing listens on
pub fn dead_url() -> String {
    "http://127.0.0.1:9".to_string()
}
