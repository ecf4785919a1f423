// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Role Aggregate and Principal Role Sets
//!
//! Roles carry a unique name and an ordered list of permission strings. The
//! name is what route rules and role-based conditions match against; the
//! permission list is informational for routing purposes (a `"*"` permission
//! grants nothing at the route layer).
//!
//! [`RoleSet`] is the set of role names a principal holds at evaluation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub Uuid);

impl RoleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a role was defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleSource {
    Aws,
    Azure,
    Gcp,
    Custom,
}

impl RoleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleSource::Aws => "AWS",
            RoleSource::Azure => "AZURE",
            RoleSource::Gcp => "GCP",
            RoleSource::Custom => "CUSTOM",
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, RoleSource::Custom)
    }
}

impl fmt::Display for RoleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWS" => Ok(RoleSource::Aws),
            "AZURE" => Ok(RoleSource::Azure),
            "GCP" => Ok(RoleSource::Gcp),
            "CUSTOM" => Ok(RoleSource::Custom),
            other => Err(ValidationError::UnknownVariant {
                field: "source",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub config_data: serde_json::Map<String, serde_json::Value>,
}

impl RoleDefinition {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.name.len() > 255 {
            return Err(ValidationError::TooLong { field: "name", max: 255 });
        }
        if self.permissions.iter().any(|p| p.trim().is_empty()) {
            return Err(ValidationError::EmptyField("permissions"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    pub is_custom: bool,
    pub source: RoleSource,
    pub config_data: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(definition: RoleDefinition, source: RoleSource, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        definition.validate()?;
        Ok(Self {
            id: RoleId::new(),
            name: definition.name,
            description: definition.description,
            permissions: dedup_preserving_order(definition.permissions),
            is_custom: source.is_custom(),
            source,
            config_data: definition.config_data,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces the editable fields; source and custom flag are fixed at creation.
    pub fn apply(&mut self, definition: RoleDefinition, now: DateTime<Utc>) -> Result<(), ValidationError> {
        definition.validate()?;
        self.name = definition.name;
        self.description = definition.description;
        self.permissions = dedup_preserving_order(definition.permissions);
        self.config_data = definition.config_data;
        self.updated_at = now;
        Ok(())
    }
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

/// Role names held by a principal. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// First name in `candidates` (in candidate order) that this set holds.
    pub fn first_match<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        candidates
            .iter()
            .map(String::as_str)
            .find(|candidate| self.contains(candidate))
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_set_is_case_sensitive() {
        let roles: RoleSet = ["Manager"].into_iter().collect();
        assert!(roles.contains("Manager"));
        assert!(!roles.contains("manager"));
    }

    #[test]
    fn test_first_match_follows_candidate_order() {
        let roles: RoleSet = ["Guest", "Admin"].into_iter().collect();
        let candidates = vec!["Admin".to_string(), "Guest".to_string()];
        assert_eq!(roles.first_match(&candidates), Some("Admin"));
        assert_eq!(RoleSet::new().first_match(&candidates), None);
    }

    #[test]
    fn test_permissions_deduplicated_in_order() {
        let role = Role::new(
            RoleDefinition {
                name: "Reviewer".to_string(),
                description: None,
                permissions: vec!["review".into(), "approve".into(), "review".into()],
                config_data: Default::default(),
            },
            RoleSource::Custom,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(role.permissions, vec!["review".to_string(), "approve".to_string()]);
        assert!(role.is_custom);
    }

    #[test]
    fn test_imported_role_is_not_custom() {
        let role = Role::new(
            RoleDefinition {
                name: "AWS-ReadOnlyAccess".to_string(),
                description: None,
                permissions: vec!["s3:Get*".into()],
                config_data: Default::default(),
            },
            RoleSource::Aws,
            Utc::now(),
        )
        .unwrap();
        assert!(!role.is_custom);
        assert_eq!(role.source, RoleSource::Aws);
    }
}
