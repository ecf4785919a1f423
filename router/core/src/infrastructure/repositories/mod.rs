// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository contracts defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve domain aggregates
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! One module per aggregate (`postgres_agent`, `postgres_route`, ...), all
//! sharing a `PgPool`. Multi-row mutations run inside a transaction.
//!
//! ## In-Memory Repositories
//!
//! All in-memory repositories created from the same [`InMemoryStore`] share a
//! single `RwLock`-guarded set of tables. Each repository call takes the lock
//! once, so a mutation is applied completely or not at all, and the foreign
//! key and uniqueness rules of the SQL schema are checked under that lock.

pub mod postgres_activity;
pub mod postgres_agent;
pub mod postgres_condition;
pub mod postgres_feature;
pub mod postgres_role;
pub mod postgres_route;
pub mod postgres_user;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::activity::ActivityLogEntry;
use crate::domain::agent::{Agent, AgentId};
use crate::domain::condition::{Condition, ConditionId};
use crate::domain::feature::{Feature, FeatureId};
use crate::domain::repository::{
    ActivityLogRepository, AgentRepository, ConditionRepository, FeatureRepository, Page, RepositoryError,
    RoleRepository, RouteRepository, UserRepository, ROUTE_AGENT_FK, ROUTE_CONDITION_FK, ROUTE_FEATURE_FK,
    USER_ROLE_FK,
};
use crate::domain::role::{Role, RoleId};
use crate::domain::route::{Route, RouteId, RouteStatus};
use crate::domain::user::{User, UserId};

const ROLE_NAME_KEY: &str = "roles_name_key";
const USER_EMAIL_KEY: &str = "users_email_key";

/// Route row plus its link rows; attached conditions live in `conditions`.
#[derive(Clone)]
struct StoredRoute {
    route: Route,
    condition_ids: Vec<ConditionId>,
}

#[derive(Default)]
struct Tables {
    agents: HashMap<AgentId, Agent>,
    features: HashMap<FeatureId, Feature>,
    roles: HashMap<RoleId, Role>,
    users: HashMap<UserId, User>,
    conditions: HashMap<ConditionId, Condition>,
    routes: HashMap<RouteId, StoredRoute>,
    activity: Vec<ActivityLogEntry>,
}

impl Tables {
    fn hydrate(&self, stored: &StoredRoute) -> Route {
        let mut route = stored.route.clone();
        route.conditions = stored
            .condition_ids
            .iter()
            .filter_map(|id| self.conditions.get(id).cloned())
            .collect();
        route
    }

    fn role_name_taken(&self, name: &str, except: RoleId) -> bool {
        self.roles.values().any(|r| r.name == name && r.id != except)
    }
}

/// Shared backing tables for the in-memory repositories
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agents(&self) -> InMemoryAgentRepository {
        InMemoryAgentRepository { store: self.clone() }
    }

    pub fn features(&self) -> InMemoryFeatureRepository {
        InMemoryFeatureRepository { store: self.clone() }
    }

    pub fn roles(&self) -> InMemoryRoleRepository {
        InMemoryRoleRepository { store: self.clone() }
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository { store: self.clone() }
    }

    pub fn conditions(&self) -> InMemoryConditionRepository {
        InMemoryConditionRepository { store: self.clone() }
    }

    pub fn routes(&self) -> InMemoryRouteRepository {
        InMemoryRouteRepository { store: self.clone() }
    }

    pub fn activity(&self) -> InMemoryActivityLogRepository {
        InMemoryActivityLogRepository { store: self.clone() }
    }
}

fn sorted_by<T, K: Ord>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| key(item));
    items
}

#[derive(Clone, Default)]
pub struct InMemoryAgentRepository {
    store: InMemoryStore,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        InMemoryStore::new().agents()
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError> {
        self.store.tables.write().agents.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn save_all(&self, agents: &[Agent]) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        for agent in agents {
            tables.agents.insert(agent.id, agent.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        Ok(self.store.tables.read().agents.get(&id).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<Agent>, RepositoryError> {
        let tables = self.store.tables.read();
        let agents = sorted_by(tables.agents.values().cloned(), |a| (a.created_at, a.id));
        Ok(page.apply(agents))
    }

    async fn delete(&self, id: AgentId) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        if !tables.agents.contains_key(&id) {
            return Err(RepositoryError::NotFound(format!("agent {id}")));
        }
        if tables.routes.values().any(|r| r.route.agent_id == id) {
            return Err(RepositoryError::ForeignKey(ROUTE_AGENT_FK.to_string()));
        }
        tables.agents.remove(&id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryFeatureRepository {
    store: InMemoryStore,
}

impl InMemoryFeatureRepository {
    pub fn new() -> Self {
        InMemoryStore::new().features()
    }
}

#[async_trait]
impl FeatureRepository for InMemoryFeatureRepository {
    async fn save(&self, feature: &Feature) -> Result<(), RepositoryError> {
        self.store.tables.write().features.insert(feature.id, feature.clone());
        Ok(())
    }

    async fn save_all(&self, features: &[Feature]) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        for feature in features {
            tables.features.insert(feature.id, feature.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: FeatureId) -> Result<Option<Feature>, RepositoryError> {
        Ok(self.store.tables.read().features.get(&id).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<Feature>, RepositoryError> {
        let tables = self.store.tables.read();
        let features = sorted_by(tables.features.values().cloned(), |f| (f.created_at, f.id));
        Ok(page.apply(features))
    }

    async fn delete(&self, id: FeatureId) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        if !tables.features.contains_key(&id) {
            return Err(RepositoryError::NotFound(format!("feature {id}")));
        }
        if tables.routes.values().any(|r| r.route.feature_id == id) {
            return Err(RepositoryError::ForeignKey(ROUTE_FEATURE_FK.to_string()));
        }
        tables.features.remove(&id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRoleRepository {
    store: InMemoryStore,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        InMemoryStore::new().roles()
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn save(&self, role: &Role) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        if tables.role_name_taken(&role.name, role.id) {
            return Err(RepositoryError::Conflict(ROLE_NAME_KEY.to_string()));
        }
        tables.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn save_all(&self, roles: &[Role]) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        for (i, role) in roles.iter().enumerate() {
            let duplicate_in_batch = roles[..i].iter().any(|r| r.name == role.name);
            if duplicate_in_batch || tables.role_name_taken(&role.name, role.id) {
                return Err(RepositoryError::Conflict(ROLE_NAME_KEY.to_string()));
            }
        }
        for role in roles {
            tables.roles.insert(role.id, role.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        Ok(self.store.tables.read().roles.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError> {
        Ok(self.store.tables.read().roles.values().find(|r| r.name == name).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Role>, RepositoryError> {
        let tables = self.store.tables.read();
        Ok(sorted_by(tables.roles.values().cloned(), |r| r.name.clone()))
    }

    async fn delete(&self, id: RoleId) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        if tables.roles.remove(&id).is_none() {
            return Err(RepositoryError::NotFound(format!("role {id}")));
        }
        for user in tables.users.values_mut() {
            user.role_ids.retain(|r| *r != id);
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    store: InMemoryStore,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        InMemoryStore::new().users()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        if tables.users.values().any(|u| u.email == user.email && u.id != user.id) {
            return Err(RepositoryError::Conflict(USER_EMAIL_KEY.to_string()));
        }
        if user.role_ids.iter().any(|id| !tables.roles.contains_key(id)) {
            return Err(RepositoryError::ForeignKey(USER_ROLE_FK.to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.store.tables.read().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.store.tables.read().users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<User>, RepositoryError> {
        let tables = self.store.tables.read();
        let users = sorted_by(tables.users.values().cloned(), |u| (u.created_at, u.id));
        Ok(page.apply(users))
    }

    async fn role_names(&self, id: UserId) -> Result<Vec<String>, RepositoryError> {
        let tables = self.store.tables.read();
        let user = tables
            .users
            .get(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))?;
        Ok(user
            .role_ids
            .iter()
            .filter_map(|role_id| tables.roles.get(role_id).map(|r| r.name.clone()))
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryConditionRepository {
    store: InMemoryStore,
}

impl InMemoryConditionRepository {
    pub fn new() -> Self {
        InMemoryStore::new().conditions()
    }
}

#[async_trait]
impl ConditionRepository for InMemoryConditionRepository {
    async fn save(&self, condition: &Condition) -> Result<(), RepositoryError> {
        self.store.tables.write().conditions.insert(condition.id, condition.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ConditionId) -> Result<Option<Condition>, RepositoryError> {
        Ok(self.store.tables.read().conditions.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Condition>, RepositoryError> {
        let tables = self.store.tables.read();
        Ok(sorted_by(tables.conditions.values().cloned(), |c| (c.created_at, c.id)))
    }

    async fn delete(&self, id: ConditionId) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        if !tables.conditions.contains_key(&id) {
            return Err(RepositoryError::NotFound(format!("condition {id}")));
        }
        if tables.routes.values().any(|r| r.condition_ids.contains(&id)) {
            return Err(RepositoryError::ForeignKey(ROUTE_CONDITION_FK.to_string()));
        }
        tables.conditions.remove(&id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRouteRepository {
    store: InMemoryStore,
}

impl InMemoryRouteRepository {
    pub fn new() -> Self {
        InMemoryStore::new().routes()
    }
}

fn missing_route(id: RouteId) -> RepositoryError {
    RepositoryError::NotFound(format!("route {id}"))
}

impl Tables {
    fn check_route_refs(&self, route: &Route) -> Result<(), RepositoryError> {
        if !self.agents.contains_key(&route.agent_id) {
            return Err(RepositoryError::ForeignKey(ROUTE_AGENT_FK.to_string()));
        }
        if !self.features.contains_key(&route.feature_id) {
            return Err(RepositoryError::ForeignKey(ROUTE_FEATURE_FK.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RouteRepository for InMemoryRouteRepository {
    async fn insert(&self, route: &Route) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        if tables.routes.contains_key(&route.id) {
            return Err(RepositoryError::Conflict("routes_pkey".to_string()));
        }
        tables.check_route_refs(route)?;
        let condition_ids = route.condition_ids();
        if condition_ids.iter().any(|id| !tables.conditions.contains_key(id)) {
            return Err(RepositoryError::ForeignKey(ROUTE_CONDITION_FK.to_string()));
        }
        let mut row = route.clone();
        row.conditions = Vec::new();
        tables.routes.insert(route.id, StoredRoute { route: row, condition_ids });
        Ok(())
    }

    async fn update(&self, route: &Route) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        if !tables.routes.contains_key(&route.id) {
            return Err(missing_route(route.id));
        }
        tables.check_route_refs(route)?;
        let stored = tables.routes.get_mut(&route.id).ok_or_else(|| missing_route(route.id))?;
        stored.route.feature_id = route.feature_id;
        stored.route.agent_id = route.agent_id;
        stored.route.rules = route.rules.clone();
        stored.route.conditional = route.conditional;
        stored.route.updated_at = route.updated_at;
        Ok(())
    }

    async fn set_status(&self, id: RouteId, status: RouteStatus, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let mut tables = self.store.tables.write();
        let stored = tables.routes.get_mut(&id).ok_or_else(|| missing_route(id))?;
        if stored.route.status == status {
            return Ok(false);
        }
        stored.route.set_status(status, at);
        Ok(true)
    }

    async fn attach_condition(
        &self,
        id: RouteId,
        condition_id: ConditionId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.store.tables.write();
        if !tables.conditions.contains_key(&condition_id) {
            if !tables.routes.contains_key(&id) {
                return Err(missing_route(id));
            }
            return Err(RepositoryError::ForeignKey(ROUTE_CONDITION_FK.to_string()));
        }
        let stored = tables.routes.get_mut(&id).ok_or_else(|| missing_route(id))?;
        if stored.condition_ids.contains(&condition_id) {
            return Ok(false);
        }
        stored.condition_ids.push(condition_id);
        stored.route.updated_at = at;
        Ok(true)
    }

    async fn add_condition(&self, id: RouteId, condition: &Condition, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut tables = self.store.tables.write();
        if tables.conditions.contains_key(&condition.id) {
            return Err(RepositoryError::Conflict("conditions_pkey".to_string()));
        }
        let stored = tables.routes.get_mut(&id).ok_or_else(|| missing_route(id))?;
        stored.condition_ids.push(condition.id);
        stored.route.updated_at = at;
        tables.conditions.insert(condition.id, condition.clone());
        Ok(())
    }

    async fn detach_condition(
        &self,
        id: RouteId,
        condition_id: ConditionId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.store.tables.write();
        let stored = tables.routes.get_mut(&id).ok_or_else(|| missing_route(id))?;
        let before = stored.condition_ids.len();
        stored.condition_ids.retain(|c| *c != condition_id);
        if stored.condition_ids.len() == before {
            return Ok(false);
        }
        stored.route.updated_at = at;
        Ok(true)
    }

    async fn find_by_id(&self, id: RouteId) -> Result<Option<Route>, RepositoryError> {
        let tables = self.store.tables.read();
        Ok(tables.routes.get(&id).map(|stored| tables.hydrate(stored)))
    }

    async fn list(&self, page: Page) -> Result<Vec<Route>, RepositoryError> {
        let tables = self.store.tables.read();
        let rows = sorted_by(tables.routes.values(), |r| (r.route.created_at, r.route.id));
        Ok(page.apply(rows.into_iter().map(|stored| tables.hydrate(stored))))
    }

    async fn delete(&self, id: RouteId) -> Result<(), RepositoryError> {
        match self.store.tables.write().routes.remove(&id) {
            Some(_) => Ok(()),
            None => Err(missing_route(id)),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryActivityLogRepository {
    store: InMemoryStore,
}

impl InMemoryActivityLogRepository {
    pub fn new() -> Self {
        InMemoryStore::new().activity()
    }
}

#[async_trait]
impl ActivityLogRepository for InMemoryActivityLogRepository {
    async fn append(&self, entry: &ActivityLogEntry) -> Result<(), RepositoryError> {
        self.store.tables.write().activity.push(entry.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, RepositoryError> {
        let tables = self.store.tables.read();
        Ok(tables.activity.iter().rev().take(limit).cloned().collect())
    }
}
