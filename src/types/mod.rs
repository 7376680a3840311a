//! Type definitions
//!
//! Credentials, dashboard payloads and the local API bodies.

pub mod credential;
pub mod household;
pub mod response;

pub use credential::{CookiePayload, CredentialSet, CredentialSource, RawCookie};
pub use household::{
    ChildSchedule, CurfewConfig, DashboardSnapshot, DaySchedule, Device, DeviceSettings,
    GoalsConfig, HouseholdMember, TimeLimits,
};
pub use response::{ActionResponse, ErrorResponse, PauseRequest, PingResponse};
