//! Dashboard data models
//!
//! Payload shapes returned by the upstream parent dashboard. Only the
//! fields the poll cycle and the local API need are modelled; anything
//! else in the upstream JSON is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A household member (adult or child)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdMember {
    pub directed_id: String,
    /// "ADULT" or "CHILD"
    pub role: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub avatar_uri: Option<String>,
}

impl HouseholdMember {
    pub fn is_child(&self) -> bool {
        self.role == "CHILD"
    }

    /// First name, or a shortened id when the name is missing
    pub fn display_name(&self) -> String {
        match &self.first_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.directed_id.chars().take(10).collect(),
        }
    }
}

/// Settings block nested inside a device entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettings {
    pub child_directed_id: String,
}

/// A device assigned to a child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub device_type_id: String,
    pub device_name: String,
    pub device_settings: DeviceSettings,
    #[serde(default)]
    pub multi_modal: bool,
}

impl Device {
    pub fn child_directed_id(&self) -> &str {
        &self.device_settings.child_directed_id
    }

    /// Voice-only devices report `multiModal: false`
    pub fn is_echo(&self) -> bool {
        !self.multi_modal
    }

    pub fn is_fire_tablet(&self) -> bool {
        self.multi_modal
    }
}

/// A bedtime window, times formatted as "HH:MM"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurfewConfig {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Daily screen-time allowance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLimits {
    #[serde(default)]
    pub content_time_limits_enabled: bool,
    /// Minutes per content category, e.g. `{"ALL": 90}`
    #[serde(default)]
    pub content_time_limits: HashMap<String, u32>,
}

impl TimeLimits {
    pub fn total_minutes(&self) -> u32 {
        self.content_time_limits.get("ALL").copied().unwrap_or(0)
    }
}

/// Learning goals that must be met before other content unlocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalsConfig {
    #[serde(default)]
    pub content_goals: HashMap<String, u32>,
    #[serde(default)]
    pub learn_first_enabled: bool,
}

impl GoalsConfig {
    pub fn reading_minutes(&self) -> u32 {
        self.content_goals.get("category_BOOK").copied().unwrap_or(0)
    }
}

/// One day's configuration in a child's weekly schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    /// Upstream period type, "DayOfWeek" in practice
    #[serde(rename = "type")]
    pub kind: String,
    /// Day name ("Monday", ...)
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub curfew_config_list: Vec<CurfewConfig>,
    #[serde(default)]
    pub time_limits: TimeLimits,
    #[serde(default)]
    pub goals_config: GoalsConfig,
    #[serde(default)]
    pub time: i64,
}

impl DaySchedule {
    pub fn has_curfew(&self) -> bool {
        self.curfew_config_list.iter().any(|c| c.enabled)
    }

    pub fn first_curfew(&self) -> Option<&CurfewConfig> {
        self.curfew_config_list.iter().find(|c| c.enabled)
    }
}

/// A child's weekly schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSchedule {
    pub child_directed_id: String,
    pub period_configurations: Vec<DaySchedule>,
}

impl ChildSchedule {
    /// Look up a day by name, ignoring case
    pub fn get_day_schedule(&self, day_name: &str) -> Option<&DaySchedule> {
        self.period_configurations
            .iter()
            .find(|day| day.name.eq_ignore_ascii_case(day_name))
    }
}

/// Everything one successful poll cycle fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub members: Vec<HouseholdMember>,
    pub devices: Vec<Device>,
    /// Schedules keyed by child directed id
    pub schedules: BTreeMap<String, ChildSchedule>,
    pub fetched_at: DateTime<Utc>,
    /// Session generation the data was fetched with
    pub generation: u64,
}

impl DashboardSnapshot {
    pub fn children(&self) -> impl Iterator<Item = &HouseholdMember> {
        self.members.iter().filter(|m| m.is_child())
    }

    pub fn devices_for<'a>(&'a self, child_id: &'a str) -> impl Iterator<Item = &'a Device> {
        self.devices
            .iter()
            .filter(move |d| d.child_directed_id() == child_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_member_parsing_and_display_name() {
        let json = r#"{"directedId": "amzn1.account.CHILD123456789", "role": "CHILD"}"#;
        let member: HouseholdMember = serde_json::from_str(json).unwrap();
        assert!(member.is_child());
        assert_eq!(member.display_name(), "amzn1.acco");

        let json = r#"{"directedId": "amzn1.account.X", "role": "ADULT", "firstName": "Sam"}"#;
        let member: HouseholdMember = serde_json::from_str(json).unwrap();
        assert!(!member.is_child());
        assert_eq!(member.display_name(), "Sam");
    }

    #[test]
    fn test_device_parsing() {
        let json = r#"{
            "deviceId": "G000",
            "deviceTypeId": "A1",
            "deviceName": "Kids Tablet",
            "deviceSettings": {"childDirectedId": "child-1"},
            "multiModal": true
        }"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.child_directed_id(), "child-1");
        assert!(device.is_fire_tablet());
        assert!(!device.is_echo());
    }

    #[test]
    fn test_device_defaults_to_echo() {
        let json = r#"{
            "deviceId": "E1",
            "deviceTypeId": "B2",
            "deviceName": "Bedroom Echo",
            "deviceSettings": {"childDirectedId": "child-1"}
        }"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert!(device.is_echo());
    }

    #[test]
    fn test_schedule_parsing() {
        let json = r#"{
            "childDirectedId": "child-1",
            "periodConfigurations": [
                {
                    "type": "DayOfWeek",
                    "name": "Monday",
                    "enabled": true,
                    "curfewConfigList": [
                        {"start": "20:00", "end": "07:00", "enabled": false},
                        {"start": "21:00", "end": "06:30", "enabled": true, "type": "BEDTIME"}
                    ],
                    "timeLimits": {"contentTimeLimitsEnabled": true, "contentTimeLimits": {"ALL": 90}},
                    "goalsConfig": {"contentGoals": {"category_BOOK": 15}, "learnFirstEnabled": true},
                    "time": 1700000000
                },
                {"type": "DayOfWeek", "name": "Tuesday"}
            ]
        }"#;
        let schedule: ChildSchedule = serde_json::from_str(json).unwrap();

        let monday = schedule.get_day_schedule("monday").unwrap();
        assert!(monday.has_curfew());
        assert_eq!(monday.first_curfew().unwrap().start, "21:00");
        assert_eq!(monday.time_limits.total_minutes(), 90);
        assert_eq!(monday.goals_config.reading_minutes(), 15);

        let tuesday = schedule.get_day_schedule("Tuesday").unwrap();
        assert!(!tuesday.has_curfew());
        assert_eq!(tuesday.time_limits.total_minutes(), 0);

        assert!(schedule.get_day_schedule("Sunday").is_none());
    }

    #[test]
    fn test_snapshot_helpers() {
        let member = |id: &str, role: &str| HouseholdMember {
            directed_id: id.to_string(),
            role: role.to_string(),
            first_name: None,
            avatar_uri: None,
        };
        let device = |id: &str, child: &str| Device {
            device_id: id.to_string(),
            device_type_id: "T".to_string(),
            device_name: id.to_string(),
            device_settings: DeviceSettings {
                child_directed_id: child.to_string(),
            },
            multi_modal: false,
        };

        let snapshot = DashboardSnapshot {
            members: vec![member("parent", "ADULT"), member("kid", "CHILD")],
            devices: vec![device("d1", "kid"), device("d2", "other")],
            schedules: BTreeMap::new(),
            fetched_at: Utc::now(),
            generation: 1,
        };

        let children: Vec<_> = snapshot.children().map(|m| m.directed_id.as_str()).collect();
        assert_eq!(children, vec!["kid"]);
        assert_eq!(snapshot.devices_for("kid").count(), 1);
    }
}
