// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Condition Catalog Entries
//!
//! A condition is a named predicate that gates a conditional route. Two kinds
//! exist:
//!
//! | `condition_type` | Payload | Satisfied when |
//! |------------------|---------|----------------|
//! | `time_based` | `start_time`, `end_time`, `timezone`, `days_of_week` | the instant, seen in `timezone`, falls on one of the days and inside `[start_time, end_time)` |
//! | `role_based` | `allowed_roles`, `override_time_restrictions` | the principal holds one of the roles |
//!
//! Operators submit a loosely typed [`ConditionSpec`]. It is parsed into a
//! [`ConditionRule`] once, at creation or update time; malformed times,
//! timezones or weekday names are rejected there with a
//! [`ValidationError`]. A stored condition is always evaluable.
//!
//! A `start_time` later than `end_time` describes a window that wraps past
//! midnight (e.g. `22:00`-`06:00`); the weekday is taken from the local date
//! of the evaluated instant.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::role::RoleSet;
use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionId(pub Uuid);

impl ConditionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ConditionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const TIME_BASED: &str = "time_based";
pub const ROLE_BASED: &str = "role_based";

/// Unvalidated condition as submitted by an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub condition_type: String,
    #[serde(default)]
    pub condition_data: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTimeWindow {
    start_time: String,
    end_time: String,
    #[serde(default = "default_timezone")]
    timezone: String,
    days_of_week: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRoleGate {
    allowed_roles: Vec<String>,
    #[serde(default)]
    override_time_restrictions: bool,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time")]
    pub end_time: NaiveTime,
    pub timezone: Tz,
    #[serde(with = "weekday_names")]
    pub days_of_week: Vec<Weekday>,
}

impl TimeWindow {
    fn parse(raw: RawTimeWindow) -> Result<Self, ValidationError> {
        let start_time = parse_clock_time("start_time", &raw.start_time)?;
        let end_time = parse_clock_time("end_time", &raw.end_time)?;
        if start_time == end_time {
            return Err(ValidationError::EmptyTimeWindow(raw.start_time));
        }

        let timezone: Tz = raw
            .timezone
            .parse()
            .map_err(|_| ValidationError::InvalidTimezone(raw.timezone.clone()))?;

        let mut days_of_week = Vec::with_capacity(raw.days_of_week.len());
        for name in &raw.days_of_week {
            let day: Weekday = name
                .trim()
                .parse()
                .map_err(|_| ValidationError::InvalidWeekday(name.clone()))?;
            if !days_of_week.contains(&day) {
                days_of_week.push(day);
            }
        }
        if days_of_week.is_empty() {
            return Err(ValidationError::NoWeekdays);
        }
        days_of_week.sort_by_key(|d| d.num_days_from_monday());

        Ok(Self {
            start_time,
            end_time,
            timezone,
            days_of_week,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.timezone);
        if !self.days_of_week.contains(&local.weekday()) {
            return false;
        }
        let time = local.time();
        if self.start_time < self.end_time {
            time >= self.start_time && time < self.end_time
        } else {
            time >= self.start_time || time < self.end_time
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGate {
    pub allowed_roles: Vec<String>,
    #[serde(default)]
    pub override_time_restrictions: bool,
}

impl RoleGate {
    fn parse(raw: RawRoleGate) -> Result<Self, ValidationError> {
        if raw.allowed_roles.iter().any(|r| r.trim().is_empty()) {
            return Err(ValidationError::BlankRoleName("allowed_roles"));
        }
        let mut allowed_roles: Vec<String> = Vec::with_capacity(raw.allowed_roles.len());
        for role in raw.allowed_roles {
            if !allowed_roles.contains(&role) {
                allowed_roles.push(role);
            }
        }
        Ok(Self {
            allowed_roles,
            override_time_restrictions: raw.override_time_restrictions,
        })
    }

    pub fn admits(&self, roles: &RoleSet) -> bool {
        roles.first_match(&self.allowed_roles).is_some()
    }
}

/// Validated condition payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "condition_type", content = "condition_data", rename_all = "snake_case")]
pub enum ConditionRule {
    TimeBased(TimeWindow),
    RoleBased(RoleGate),
}

impl ConditionRule {
    pub fn parse(condition_type: &str, data: serde_json::Value) -> Result<Self, ValidationError> {
        let malformed = |e: serde_json::Error| ValidationError::MalformedPayload(e.to_string());
        match condition_type {
            TIME_BASED => {
                let raw: RawTimeWindow = serde_json::from_value(data).map_err(malformed)?;
                Ok(ConditionRule::TimeBased(TimeWindow::parse(raw)?))
            }
            ROLE_BASED => {
                let raw: RawRoleGate = serde_json::from_value(data).map_err(malformed)?;
                Ok(ConditionRule::RoleBased(RoleGate::parse(raw)?))
            }
            other => Err(ValidationError::UnknownConditionType(other.to_string())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ConditionRule::TimeBased(_) => TIME_BASED,
            ConditionRule::RoleBased(_) => ROLE_BASED,
        }
    }

    /// Payload in its wire form (`condition_data`)
    pub fn payload(&self) -> serde_json::Value {
        let value = match self {
            ConditionRule::TimeBased(window) => serde_json::to_value(window),
            ConditionRule::RoleBased(gate) => serde_json::to_value(gate),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub name: String,
    pub description: Option<String>,
    pub rule: ConditionRule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Condition {
    pub fn new(spec: ConditionSpec, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let (name, description, rule) = Self::validate_spec(spec)?;
        Ok(Self {
            id: ConditionId::new(),
            name,
            description,
            rule,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, spec: ConditionSpec, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let (name, description, rule) = Self::validate_spec(spec)?;
        self.name = name;
        self.description = description;
        self.rule = rule;
        self.updated_at = now;
        Ok(())
    }

    fn validate_spec(spec: ConditionSpec) -> Result<(String, Option<String>, ConditionRule), ValidationError> {
        if spec.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if spec.name.len() > 100 {
            return Err(ValidationError::TooLong { field: "name", max: 100 });
        }
        if spec.description.as_ref().is_some_and(|d| d.len() > 500) {
            return Err(ValidationError::TooLong { field: "description", max: 500 });
        }
        let rule = ConditionRule::parse(&spec.condition_type, spec.condition_data)?;
        Ok((spec.name, spec.description, rule))
    }

    pub fn is_satisfied(&self, roles: &RoleSet, at: DateTime<Utc>) -> bool {
        match &self.rule {
            ConditionRule::TimeBased(window) => window.contains(at),
            ConditionRule::RoleBased(gate) => gate.admits(roles),
        }
    }

    /// Role-based condition that, when satisfied, opens the whole gate.
    pub fn is_override(&self) -> bool {
        matches!(
            &self.rule,
            ConditionRule::RoleBased(RoleGate {
                override_time_restrictions: true,
                ..
            })
        )
    }
}

fn parse_clock_time(field: &'static str, value: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTime {
            field,
            value: value.to_string(),
        })
}

mod clock_time {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        if time.second() == 0 {
            serializer.serialize_str(&time.format("%H:%M").to_string())
        } else {
            serializer.serialize_str(&time.format("%H:%M:%S").to_string())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::parse_clock_time("time", &value).map_err(serde::de::Error::custom)
    }
}

mod weekday_names {
    use chrono::Weekday;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    fn name(day: &Weekday) -> &'static str {
        match day {
            Weekday::Mon => "monday",
            Weekday::Tue => "tuesday",
            Weekday::Wed => "wednesday",
            Weekday::Thu => "thursday",
            Weekday::Fri => "friday",
            Weekday::Sat => "saturday",
            Weekday::Sun => "sunday",
        }
    }

    pub fn serialize<S: Serializer>(days: &[Weekday], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(days.len()))?;
        for day in days {
            seq.serialize_element(name(day))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Weekday>, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names
            .iter()
            .map(|n| n.parse::<Weekday>().map_err(|_| serde::de::Error::custom(format!("invalid weekday '{n}'"))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn business_hours(timezone: &str) -> ConditionSpec {
        ConditionSpec {
            name: "Business Hours".to_string(),
            description: Some("Weekdays 9 to 5".to_string()),
            condition_type: TIME_BASED.to_string(),
            condition_data: json!({
                "start_time": "09:00",
                "end_time": "17:00",
                "timezone": timezone,
                "days_of_week": ["monday", "tuesday", "wednesday", "thursday", "friday"]
            }),
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_time_window_bounds() {
        let condition = Condition::new(business_hours("UTC"), Utc::now()).unwrap();
        let roles = RoleSet::new();
        // 2024-01-03 is a Wednesday
        assert!(condition.is_satisfied(&roles, utc(2024, 1, 3, 9, 0)));
        assert!(condition.is_satisfied(&roles, utc(2024, 1, 3, 16, 59)));
        assert!(!condition.is_satisfied(&roles, utc(2024, 1, 3, 17, 0)));
        assert!(!condition.is_satisfied(&roles, utc(2024, 1, 3, 8, 59)));
        // Saturday
        assert!(!condition.is_satisfied(&roles, utc(2024, 1, 6, 10, 0)));
    }

    #[test]
    fn test_time_window_uses_condition_timezone() {
        let condition = Condition::new(business_hours("America/New_York"), Utc::now()).unwrap();
        let roles = RoleSet::new();
        // 14:00 UTC on a Wednesday in January is 09:00 in New York
        assert!(condition.is_satisfied(&roles, utc(2024, 1, 3, 14, 0)));
        // 10:00 UTC is 05:00 in New York
        assert!(!condition.is_satisfied(&roles, utc(2024, 1, 3, 10, 0)));
        // 02:00 UTC Saturday is still Friday 21:00 in New York, outside hours
        assert!(!condition.is_satisfied(&roles, utc(2024, 1, 6, 2, 0)));
    }

    #[test]
    fn test_overnight_window_wraps() {
        let spec = ConditionSpec {
            name: "Night shift".to_string(),
            description: None,
            condition_type: TIME_BASED.to_string(),
            condition_data: json!({
                "start_time": "22:00",
                "end_time": "06:00",
                "timezone": "UTC",
                "days_of_week": ["saturday"]
            }),
        };
        let condition = Condition::new(spec, Utc::now()).unwrap();
        let roles = RoleSet::new();
        assert!(condition.is_satisfied(&roles, utc(2024, 1, 6, 23, 0)));
        assert!(condition.is_satisfied(&roles, utc(2024, 1, 6, 3, 0)));
        assert!(!condition.is_satisfied(&roles, utc(2024, 1, 6, 12, 0)));
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let result = Condition::new(business_hours("Mars/Olympus"), Utc::now());
        assert_eq!(result.unwrap_err(), ValidationError::InvalidTimezone("Mars/Olympus".into()));
    }

    #[test]
    fn test_invalid_time_rejected() {
        let mut spec = business_hours("UTC");
        spec.condition_data["end_time"] = json!("25:00");
        assert!(matches!(
            Condition::new(spec, Utc::now()),
            Err(ValidationError::InvalidTime { field: "end_time", .. })
        ));
    }

    #[test]
    fn test_invalid_weekday_rejected() {
        let mut spec = business_hours("UTC");
        spec.condition_data["days_of_week"] = json!(["funday"]);
        assert!(matches!(Condition::new(spec, Utc::now()), Err(ValidationError::InvalidWeekday(_))));
    }

    #[test]
    fn test_unknown_condition_type_rejected() {
        let mut spec = business_hours("UTC");
        spec.condition_type = "geo_based".to_string();
        assert!(matches!(
            Condition::new(spec, Utc::now()),
            Err(ValidationError::UnknownConditionType(t)) if t == "geo_based"
        ));
    }

    #[test]
    fn test_missing_payload_field_rejected() {
        let spec = ConditionSpec {
            name: "Broken".to_string(),
            description: None,
            condition_type: ROLE_BASED.to_string(),
            condition_data: json!({ "override_time_restrictions": true }),
        };
        assert!(matches!(Condition::new(spec, Utc::now()), Err(ValidationError::MalformedPayload(_))));
    }

    #[test]
    fn test_role_gate_override_flag() {
        let spec = ConditionSpec {
            name: "High Priority Users".to_string(),
            description: None,
            condition_type: ROLE_BASED.to_string(),
            condition_data: json!({ "allowed_roles": ["Admin", "Manager"], "override_time_restrictions": true }),
        };
        let condition = Condition::new(spec, Utc::now()).unwrap();
        assert!(condition.is_override());
        let admin: RoleSet = ["Admin"].into_iter().collect();
        let guest: RoleSet = ["Guest"].into_iter().collect();
        assert!(condition.is_satisfied(&admin, Utc::now()));
        assert!(!condition.is_satisfied(&guest, Utc::now()));
    }

    #[test]
    fn test_payload_wire_form() {
        let condition = Condition::new(business_hours("Europe/Berlin"), Utc::now()).unwrap();
        let payload = condition.rule.payload();
        assert_eq!(payload["start_time"], "09:00");
        assert_eq!(payload["timezone"], "Europe/Berlin");
        assert_eq!(payload["days_of_week"][0], "monday");

        let reparsed = ConditionRule::parse(condition.rule.type_name(), payload).unwrap();
        assert_eq!(reparsed, condition.rule);
    }
}
