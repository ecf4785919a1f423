// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory
//!
//! Builds the full set of repositories for the configured storage backend.
//! In-memory repositories are created from one shared store so the
//! referential checks between agents, features, conditions and routes see
//! the same tables.

use std::sync::Arc;

use anyhow::{bail, Result};
use sqlx::PgPool;

use crate::domain::repository::{
    ActivityLogRepository, AgentRepository, ConditionRepository, FeatureRepository, RoleRepository,
    RouteRepository, StorageBackend, UserRepository,
};
use crate::infrastructure::repositories::postgres_activity::PostgresActivityLogRepository;
use crate::infrastructure::repositories::postgres_agent::PostgresAgentRepository;
use crate::infrastructure::repositories::postgres_condition::PostgresConditionRepository;
use crate::infrastructure::repositories::postgres_feature::PostgresFeatureRepository;
use crate::infrastructure::repositories::postgres_role::PostgresRoleRepository;
use crate::infrastructure::repositories::postgres_route::PostgresRouteRepository;
use crate::infrastructure::repositories::postgres_user::PostgresUserRepository;
use crate::infrastructure::repositories::InMemoryStore;

/// One handle per aggregate repository
#[derive(Clone)]
pub struct Repositories {
    pub agents: Arc<dyn AgentRepository>,
    pub features: Arc<dyn FeatureRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub users: Arc<dyn UserRepository>,
    pub conditions: Arc<dyn ConditionRepository>,
    pub routes: Arc<dyn RouteRepository>,
    pub activity: Arc<dyn ActivityLogRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self {
            agents: Arc::new(store.agents()),
            features: Arc::new(store.features()),
            roles: Arc::new(store.roles()),
            users: Arc::new(store.users()),
            conditions: Arc::new(store.conditions()),
            routes: Arc::new(store.routes()),
            activity: Arc::new(store.activity()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            agents: Arc::new(PostgresAgentRepository::new(pool.clone())),
            features: Arc::new(PostgresFeatureRepository::new(pool.clone())),
            roles: Arc::new(PostgresRoleRepository::new(pool.clone())),
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            conditions: Arc::new(PostgresConditionRepository::new(pool.clone())),
            routes: Arc::new(PostgresRouteRepository::new(pool.clone())),
            activity: Arc::new(PostgresActivityLogRepository::new(pool)),
        }
    }
}

/// Creates the repositories for `backend`; PostgreSQL requires a connected pool.
pub fn create_repositories(backend: &StorageBackend, pool: Option<PgPool>) -> Result<Repositories> {
    match (backend, pool) {
        (StorageBackend::InMemory, _) => Ok(Repositories::in_memory()),
        (StorageBackend::PostgreSQL(_), Some(pool)) => Ok(Repositories::postgres(pool)),
        (StorageBackend::PostgreSQL(_), None) => bail!("PostgreSQL backend selected but no connection pool was provided"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::PostgresConfig;

    #[test]
    fn test_postgres_backend_requires_pool() {
        let backend = StorageBackend::PostgreSQL(PostgresConfig {
            connection_string: "postgres://localhost/router".into(),
            max_connections: 5,
        });
        assert!(create_repositories(&backend, None).is_err());
        assert!(create_repositories(&StorageBackend::InMemory, None).is_ok());
    }
}
