// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Route Aggregate
//!
//! A route binds one [`Feature`](crate::domain::feature::Feature) to one
//! [`Agent`](crate::domain::agent::Agent) under a [`RouteRules`] value and an
//! optional set of gating [`Condition`]s.
//!
//! The aggregate owns its rule set and its condition membership. Whether the
//! referenced agent and feature exist is checked by the route service before
//! anything is persisted; the aggregate itself only holds the ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::condition::{Condition, ConditionId};
use crate::domain::feature::FeatureId;
use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub Uuid);

impl RouteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RouteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    #[default]
    Active,
    Inactive,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Active => "active",
            RouteStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RouteStatus::Active),
            "inactive" => Ok(RouteStatus::Inactive),
            other => Err(ValidationError::UnknownVariant {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Allow-all / allow-list / deny-list triple governing base access.
///
/// Serialized with the `allowAll` key used by existing clients; `allow_all`
/// is accepted on input as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRules {
    #[serde(rename = "allowAll", alias = "allow_all", default)]
    pub allow_all: bool,
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub disallowed: Vec<String>,
}

impl RouteRules {
    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            ..Default::default()
        }
    }

    pub fn allow_only<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow_all: false,
            allowed: roles.into_iter().map(Into::into).collect(),
            disallowed: Vec::new(),
        }
    }

    pub fn denying<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallowed.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Rejects blank role names and collapses duplicates, keeping first
    /// occurrence order.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        Ok(Self {
            allow_all: self.allow_all,
            allowed: normalize_role_list("allowed", self.allowed)?,
            disallowed: normalize_role_list("disallowed", self.disallowed)?,
        })
    }
}

fn normalize_role_list(field: &'static str, roles: Vec<String>) -> Result<Vec<String>, ValidationError> {
    let mut out: Vec<String> = Vec::with_capacity(roles.len());
    for role in roles {
        if role.trim().is_empty() {
            return Err(ValidationError::BlankRoleName(field));
        }
        if !out.contains(&role) {
            out.push(role);
        }
    }
    Ok(out)
}

/// Caller-supplied fields of a route (create and full update)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDraft {
    pub feature_id: FeatureId,
    pub agent_id: AgentId,
    pub rules: RouteRules,
    #[serde(default)]
    pub conditional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub feature_id: FeatureId,
    pub agent_id: AgentId,
    pub rules: RouteRules,
    pub conditional: bool,
    pub status: RouteStatus,
    /// Attached conditions in attachment order; never holds two entries with
    /// the same id.
    pub conditions: Vec<Condition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    pub fn new(draft: RouteDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: RouteId::new(),
            feature_id: draft.feature_id,
            agent_id: draft.agent_id,
            rules: draft.rules.normalized()?,
            conditional: draft.conditional,
            status: RouteStatus::Active,
            conditions: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces references, rules and the conditional flag. Status and
    /// attached conditions are left untouched.
    pub fn apply(&mut self, draft: RouteDraft, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let rules = draft.rules.normalized()?;
        self.feature_id = draft.feature_id;
        self.agent_id = draft.agent_id;
        self.rules = rules;
        self.conditional = draft.conditional;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_status(&mut self, status: RouteStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub fn has_condition(&self, id: ConditionId) -> bool {
        self.conditions.iter().any(|c| c.id == id)
    }

    /// Returns false (and changes nothing) when a condition with the same id
    /// is already attached.
    pub fn attach(&mut self, condition: Condition, now: DateTime<Utc>) -> bool {
        if self.has_condition(condition.id) {
            return false;
        }
        self.conditions.push(condition);
        self.updated_at = now;
        true
    }

    /// Returns false (and changes nothing) when the condition is not attached.
    pub fn detach(&mut self, id: ConditionId, now: DateTime<Utc>) -> bool {
        let before = self.conditions.len();
        self.conditions.retain(|c| c.id != id);
        if self.conditions.len() == before {
            return false;
        }
        self.updated_at = now;
        true
    }

    pub fn condition_ids(&self) -> Vec<ConditionId> {
        self.conditions.iter().map(|c| c.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::{ConditionSpec, ROLE_BASED};
    use serde_json::json;

    fn draft() -> RouteDraft {
        RouteDraft {
            feature_id: FeatureId::new(),
            agent_id: AgentId::new(),
            rules: RouteRules::allow_only(["Manager"]),
            conditional: true,
        }
    }

    fn admin_gate() -> Condition {
        Condition::new(
            ConditionSpec {
                name: "Admins".to_string(),
                description: None,
                condition_type: ROLE_BASED.to_string(),
                condition_data: json!({ "allowed_roles": ["Admin"] }),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_rules_wire_format() {
        let rules: RouteRules = serde_json::from_value(json!({
            "allowAll": true,
            "disallowed": ["Guest"]
        }))
        .unwrap();
        assert!(rules.allow_all);
        assert!(rules.allowed.is_empty());

        let snake: RouteRules = serde_json::from_value(json!({ "allow_all": true })).unwrap();
        assert!(snake.allow_all);

        let out = serde_json::to_value(RouteRules::allow_all()).unwrap();
        assert_eq!(out["allowAll"], true);
    }

    #[test]
    fn test_blank_role_rejected() {
        let mut d = draft();
        d.rules.disallowed.push("  ".to_string());
        assert_eq!(
            Route::new(d, Utc::now()).unwrap_err(),
            ValidationError::BlankRoleName("disallowed")
        );
    }

    #[test]
    fn test_duplicate_roles_collapsed() {
        let mut d = draft();
        d.rules.allowed = vec!["Manager".into(), "Reviewer".into(), "Manager".into()];
        let route = Route::new(d, Utc::now()).unwrap();
        assert_eq!(route.rules.allowed, vec!["Manager".to_string(), "Reviewer".to_string()]);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut route = Route::new(draft(), Utc::now()).unwrap();
        let condition = admin_gate();
        assert!(route.attach(condition.clone(), Utc::now()));
        assert!(!route.attach(condition.clone(), Utc::now()));
        assert_eq!(route.conditions.len(), 1);
        assert_eq!(route.condition_ids(), vec![condition.id]);
    }

    #[test]
    fn test_detach_unattached_is_noop() {
        let mut route = Route::new(draft(), Utc::now()).unwrap();
        route.attach(admin_gate(), Utc::now());
        let before = route.clone();
        assert!(!route.detach(ConditionId::new(), Utc::now()));
        assert_eq!(route, before);
    }

    #[test]
    fn test_apply_keeps_status_and_conditions() {
        let mut route = Route::new(draft(), Utc::now()).unwrap();
        route.attach(admin_gate(), Utc::now());
        route.set_status(RouteStatus::Inactive, Utc::now());

        let mut update = draft();
        update.rules = RouteRules::allow_all().denying(["Guest"]);
        update.conditional = false;
        route.apply(update.clone(), Utc::now()).unwrap();

        assert_eq!(route.status, RouteStatus::Inactive);
        assert_eq!(route.conditions.len(), 1);
        assert_eq!(route.agent_id, update.agent_id);
        assert!(route.rules.allow_all);
    }
}
