// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # User Aggregate
//!
//! Users are principals. The router never authenticates them; it only keeps
//! their role memberships so the role registry can resolve a principal to a
//! [`RoleSet`](crate::domain::role::RoleSet).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::role::RoleId;
use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for UserStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            other => Err(ValidationError::UnknownVariant {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub status: UserStatus,
    pub role_ids: Vec<RoleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: String,
        name: String,
        hashed_password: String,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let email = email.trim().to_string();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(ValidationError::InvalidEmail(email)),
        }
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        Ok(Self {
            id: UserId::new(),
            email,
            name,
            hashed_password,
            status: UserStatus::Active,
            role_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns false when the role was already assigned.
    pub fn assign_role(&mut self, role_id: RoleId, now: DateTime<Utc>) -> bool {
        if self.role_ids.contains(&role_id) {
            return false;
        }
        self.role_ids.push(role_id);
        self.updated_at = now;
        true
    }

    pub fn revoke_role(&mut self, role_id: RoleId, now: DateTime<Utc>) -> bool {
        let before = self.role_ids.len();
        self.role_ids.retain(|id| *id != role_id);
        let removed = self.role_ids.len() != before;
        if removed {
            self.updated_at = now;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_must_have_domain() {
        let result = User::new("alice".into(), "Alice".into(), "hash".into(), Utc::now());
        assert!(matches!(result, Err(ValidationError::InvalidEmail(_))));
    }

    #[test]
    fn test_role_assignment_is_idempotent() {
        let mut user = User::new("alice@example.com".into(), "Alice".into(), "hash".into(), Utc::now()).unwrap();
        let role = RoleId::new();
        assert!(user.assign_role(role, Utc::now()));
        assert!(!user.assign_role(role, Utc::now()));
        assert_eq!(user.role_ids.len(), 1);
        assert!(user.revoke_role(role, Utc::now()));
        assert!(!user.revoke_role(role, Utc::now()));
    }
}
