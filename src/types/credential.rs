//! Credential type definitions
//!
//! A [`CredentialSet`] is the cookie collection plus the anti-forgery token
//! needed to call the upstream dashboard. It is built once per acquisition
//! and never mutated afterwards; a refresh always produces a new set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Payload format version written by the store and the companion
pub const PAYLOAD_VERSION: &str = "1.0";

/// A single browser cookie as exported by the companion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCookie {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Unix timestamp; `-1` marks a session cookie
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub secure: bool,
}

impl RawCookie {
    /// Create a cookie with only a name and a value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            secure: false,
        }
    }
}

/// Cookie payload as served by the companion and persisted by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookiePayload {
    pub cookies: Vec<RawCookie>,
    /// ISO-8601 time the cookies were captured, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CookiePayload {
    /// Wrap cookies in a payload stamped with the current time
    pub fn new(cookies: Vec<RawCookie>) -> Self {
        Self {
            cookies,
            timestamp: Some(Utc::now().to_rfc3339()),
            version: Some(PAYLOAD_VERSION.to_string()),
        }
    }

    /// Parse a payload, accepting a bare cookie array as well
    ///
    /// Browser extensions export a plain JSON array of cookies, while the
    /// companion wraps the array in an object.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        match serde_json::from_slice::<Self>(bytes) {
            Ok(payload) => Ok(payload),
            Err(object_err) => match serde_json::from_slice::<Vec<RawCookie>>(bytes) {
                Ok(cookies) => Ok(Self {
                    cookies,
                    timestamp: None,
                    version: None,
                }),
                Err(_) => Err(object_err),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Where a credential set came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Live companion service at the given base URL
    Companion(String),
    /// Encrypted credential store
    Store,
    /// Set built by hand (imports, tests)
    Manual,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Companion(url) => write!(f, "companion({})", url),
            CredentialSource::Store => write!(f, "store"),
            CredentialSource::Manual => write!(f, "manual"),
        }
    }
}

/// Cookies plus the anti-forgery token extracted from them
#[derive(Clone, PartialEq)]
pub struct CredentialSet {
    cookies: BTreeMap<String, String>,
    csrf_cookie_name: String,
    csrf_token: Option<String>,
    source: CredentialSource,
    acquired_at: DateTime<Utc>,
}

impl CredentialSet {
    /// Build a set from raw cookies, taking the token from `csrf_cookie_name`
    ///
    /// Cookie names are unique; a later duplicate wins.
    pub fn from_cookies(
        cookies: &[RawCookie],
        csrf_cookie_name: &str,
        source: CredentialSource,
    ) -> Self {
        let cookies: BTreeMap<String, String> = cookies
            .iter()
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect();
        let csrf_token = cookies
            .get(csrf_cookie_name)
            .filter(|v| !v.is_empty())
            .cloned();

        Self {
            cookies,
            csrf_cookie_name: csrf_cookie_name.to_string(),
            csrf_token,
            source,
            acquired_at: Utc::now(),
        }
    }

    /// Build a set from a payload
    pub fn from_payload(
        payload: &CookiePayload,
        csrf_cookie_name: &str,
        source: CredentialSource,
    ) -> Self {
        Self::from_cookies(&payload.cookies, csrf_cookie_name, source)
    }

    /// The empty set held before the first acquisition
    pub fn empty() -> Self {
        Self {
            cookies: BTreeMap::new(),
            csrf_cookie_name: String::new(),
            csrf_token: None,
            source: CredentialSource::Manual,
            acquired_at: Utc::now(),
        }
    }

    /// Token present and at least one session cookie besides it
    pub fn is_usable(&self) -> bool {
        self.csrf_token.is_some() && self.session_cookie_count() > 0
    }

    /// Explain why the set is not usable, if it is not
    pub fn unusable_reason(&self) -> Option<&'static str> {
        if self.cookies.is_empty() {
            Some("no cookies")
        } else if self.csrf_token.is_none() {
            Some("anti-forgery token missing")
        } else if self.session_cookie_count() == 0 {
            Some("no session cookies")
        } else {
            None
        }
    }

    fn session_cookie_count(&self) -> usize {
        self.cookies
            .keys()
            .filter(|name| **name != self.csrf_cookie_name)
            .count()
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// Render the `Cookie` request header value
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// Cookie values are secrets; only names and counts are printed.
impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .field("csrf_token", &self.csrf_token.as_ref().map(|_| "<redacted>"))
            .field("source", &self.source)
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}
