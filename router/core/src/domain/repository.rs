// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root: one repository per
//! aggregate, interface defined in the domain layer, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `AgentRepository` | `Agent` | `InMemoryAgentRepository`, `PostgresAgentRepository` |
//! | `FeatureRepository` | `Feature` | `InMemoryFeatureRepository`, `PostgresFeatureRepository` |
//! | `RoleRepository` | `Role` | `InMemoryRoleRepository`, `PostgresRoleRepository` |
//! | `UserRepository` | `User` | `InMemoryUserRepository`, `PostgresUserRepository` |
//! | `ConditionRepository` | `Condition` | `InMemoryConditionRepository`, `PostgresConditionRepository` |
//! | `RouteRepository` | `Route` | `InMemoryRouteRepository`, `PostgresRouteRepository` |
//! | `ActivityLogRepository` | `ActivityLogEntry` | `InMemoryActivityLogRepository`, `PostgresActivityLogRepository` |
//!
//! ## Atomicity
//!
//! Every method is a single all-or-nothing unit; the `save_all` methods
//! commit the whole batch or nothing. Route mutations never write back a
//! previously loaded snapshot: each one re-checks that the route still
//! exists inside its own lock or transaction and reports `NotFound` when it
//! does not. Only `add_condition` writes a condition row through the route
//! repository, and only a new one.
//!
//! ## Referential integrity
//!
//! Implementations refuse dangling references and refuse to delete rows that
//! are still referenced, reporting [`RepositoryError::ForeignKey`] with the
//! name of the violated constraint (see the `*_FK` constants).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::activity::ActivityLogEntry;
use crate::domain::agent::{Agent, AgentId};
use crate::domain::condition::{Condition, ConditionId};
use crate::domain::feature::{Feature, FeatureId};
use crate::domain::role::{Role, RoleId};
use crate::domain::route::{Route, RouteId, RouteStatus};
use crate::domain::user::{User, UserId};

pub const ROUTE_AGENT_FK: &str = "routes_agent_id_fkey";
pub const ROUTE_FEATURE_FK: &str = "routes_feature_id_fkey";
pub const ROUTE_CONDITION_FK: &str = "route_conditions_condition_id_fkey";
pub const USER_ROLE_FK: &str = "user_roles_role_id_fkey";

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

/// Offset pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Page {
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit }
    }

    pub fn all() -> Self {
        Self {
            skip: 0,
            limit: usize::MAX,
        }
    }

    /// `page`/`size` (1-based) wins over `skip`/`limit` when both are given.
    pub fn from_query(skip: Option<usize>, limit: Option<usize>, page: Option<usize>, size: Option<usize>) -> Self {
        match (page, size) {
            (Some(page), Some(size)) => Self {
                skip: page.saturating_sub(1).saturating_mul(size),
                limit: size,
            },
            _ => Self {
                skip: skip.unwrap_or(0),
                limit: limit.unwrap_or(Self::DEFAULT_LIMIT),
            },
        }
    }

    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items.into_iter().skip(self.skip).take(self.limit).collect()
    }

    /// LIMIT value for SQL, clamped to i64
    pub fn sql_limit(&self) -> i64 {
        i64::try_from(self.limit).unwrap_or(i64::MAX)
    }

    pub fn sql_offset(&self) -> i64 {
        i64::try_from(self.skip).unwrap_or(i64::MAX)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Save agent (create or update)
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError>;

    /// Save a discovered batch in one transaction
    async fn save_all(&self, agents: &[Agent]) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError>;

    /// List agents ordered by creation time
    async fn list(&self, page: Page) -> Result<Vec<Agent>, RepositoryError>;

    /// Delete agent; `NotFound` if absent, `ForeignKey` if a route references it
    async fn delete(&self, id: AgentId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait FeatureRepository: Send + Sync {
    async fn save(&self, feature: &Feature) -> Result<(), RepositoryError>;

    async fn save_all(&self, features: &[Feature]) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: FeatureId) -> Result<Option<Feature>, RepositoryError>;

    async fn list(&self, page: Page) -> Result<Vec<Feature>, RepositoryError>;

    async fn delete(&self, id: FeatureId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Save role (create or update); `Conflict` if another role holds the name
    async fn save(&self, role: &Role) -> Result<(), RepositoryError>;

    /// Insert a batch of new roles in one transaction
    async fn save_all(&self, roles: &[Role]) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError>;

    /// List roles ordered by name
    async fn list_all(&self) -> Result<Vec<Role>, RepositoryError>;

    /// Delete role and its user memberships
    async fn delete(&self, id: RoleId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Save user with its role memberships; `Conflict` on duplicate email,
    /// `ForeignKey` if a role id does not exist
    async fn save(&self, user: &User) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn list(&self, page: Page) -> Result<Vec<User>, RepositoryError>;

    /// Names of the roles currently held by the user
    async fn role_names(&self, id: UserId) -> Result<Vec<String>, RepositoryError>;
}

#[async_trait]
pub trait ConditionRepository: Send + Sync {
    async fn save(&self, condition: &Condition) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: ConditionId) -> Result<Option<Condition>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Condition>, RepositoryError>;

    /// Delete condition; `ForeignKey` while any route has it attached
    async fn delete(&self, id: ConditionId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    /// Insert a new route and links to its attached conditions, which must
    /// already be stored
    async fn insert(&self, route: &Route) -> Result<(), RepositoryError>;

    /// Rewrite feature, agent, rules, the conditional flag and `updated_at`.
    /// Status and attachments are left alone.
    async fn update(&self, route: &Route) -> Result<(), RepositoryError>;

    /// Returns `false` when the route already had `status`
    async fn set_status(&self, id: RouteId, status: RouteStatus, at: DateTime<Utc>) -> Result<bool, RepositoryError>;

    /// Link a stored condition after the existing ones. Returns `false` when
    /// it was already linked; `ForeignKey` when the condition does not exist.
    async fn attach_condition(
        &self,
        id: RouteId,
        condition_id: ConditionId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Store a new condition and link it to the route in one unit
    async fn add_condition(&self, id: RouteId, condition: &Condition, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Returns `false` when the condition was not linked
    async fn detach_condition(
        &self,
        id: RouteId,
        condition_id: ConditionId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Load route with its currently attached conditions
    async fn find_by_id(&self, id: RouteId) -> Result<Option<Route>, RepositoryError>;

    async fn list(&self, page: Page) -> Result<Vec<Route>, RepositoryError>;

    async fn delete(&self, id: RouteId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    async fn append(&self, entry: &ActivityLogEntry) -> Result<(), RepositoryError>;

    /// Most recent entries first
    async fn recent(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKey(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.constraint().unwrap_or(db.message()).to_string())
            }
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                RepositoryError::ForeignKey(db.constraint().unwrap_or(db.message()).to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
