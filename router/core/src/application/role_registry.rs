// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Role Registry
//!
//! Roles, users and the memberships between them. Role names are unique;
//! the check runs before the write and the repository enforces it again.
//!
//! Principal roles are resolved from storage on every call. Nothing is
//! cached, so a revoked role stops matching on the next evaluation.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::application::errors::ServiceError;
use crate::application::repository_factory::Repositories;
use crate::domain::clock::Clock;
use crate::domain::discovery::{DiscoveryError, IamRoleSource};
use crate::domain::events::RoleEvent;
use crate::domain::repository::{Page, RepositoryError, RoleRepository, UserRepository};
use crate::domain::role::{Role, RoleDefinition, RoleId, RoleSet, RoleSource};
use crate::domain::user::{User, UserId};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    /// Credential hash produced by the authentication collaborator
    #[serde(default)]
    pub hashed_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleImportReport {
    pub provider: RoleSource,
    pub imported: Vec<Role>,
    pub failed: Vec<RoleImportFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleImportFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignmentReport {
    pub role_id: RoleId,
    pub assigned: Vec<UserId>,
    pub failed: Vec<RoleAssignmentFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignmentFailure {
    pub user_id: UserId,
    pub error: String,
}

pub struct RoleRegistry {
    roles: Arc<dyn RoleRepository>,
    users: Arc<dyn UserRepository>,
    iam: Arc<dyn IamRoleSource>,
    iam_timeout: Duration,
    clock: Arc<dyn Clock>,
    event_bus: Arc<EventBus>,
}

impl RoleRegistry {
    pub fn new(
        repositories: &Repositories,
        iam: Arc<dyn IamRoleSource>,
        iam_timeout: Duration,
        clock: Arc<dyn Clock>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            roles: repositories.roles.clone(),
            users: repositories.users.clone(),
            iam,
            iam_timeout,
            clock,
            event_bus,
        }
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, ServiceError> {
        Ok(self.roles.list_all().await?)
    }

    pub async fn get_role(&self, id: RoleId) -> Result<Role, ServiceError> {
        self.roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Role", id))
    }

    /// Creates a custom role.
    pub async fn create_role(&self, definition: RoleDefinition) -> Result<Role, ServiceError> {
        let role = Role::new(definition, RoleSource::Custom, self.clock.now())?;
        self.ensure_name_free(&role.name, role.id).await?;
        self.roles.save(&role).await.map_err(name_conflict)?;

        info!(role_id = %role.id, name = %role.name, "Role created");
        self.event_bus.publish_role_event(RoleEvent::RoleCreated {
            role_id: role.id,
            name: role.name.clone(),
            source: role.source,
            created_at: role.created_at,
        });
        Ok(role)
    }

    pub async fn update_role(&self, id: RoleId, definition: RoleDefinition) -> Result<Role, ServiceError> {
        let mut role = self.get_role(id).await?;
        role.apply(definition, self.clock.now())?;
        self.ensure_name_free(&role.name, role.id).await?;
        self.roles.save(&role).await.map_err(name_conflict)?;

        info!(role_id = %id, name = %role.name, "Role updated");
        self.event_bus.publish_role_event(RoleEvent::RoleUpdated {
            role_id: id,
            updated_at: role.updated_at,
        });
        Ok(role)
    }

    /// Deletes the role together with every user membership of it.
    pub async fn delete_role(&self, id: RoleId) -> Result<(), ServiceError> {
        match self.roles.delete(id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound(_)) => return Err(ServiceError::not_found("Role", id)),
            Err(e) => return Err(e.into()),
        }

        info!(role_id = %id, "Role deleted");
        self.event_bus.publish_role_event(RoleEvent::RoleDeleted {
            role_id: id,
            deleted_at: self.clock.now(),
        });
        Ok(())
    }

    /// Imports the provider's roles. Names that already exist are reported as
    /// failed; the remaining roles are written in one batch.
    pub async fn import_iam_roles(&self, provider: RoleSource) -> Result<RoleImportReport, ServiceError> {
        let definitions = tokio::time::timeout(self.iam_timeout, self.iam.list_roles(provider))
            .await
            .map_err(|_| DiscoveryError::Timeout {
                operation: "IAM role import",
                seconds: self.iam_timeout.as_secs(),
            })??;

        let now = self.clock.now();
        let mut imported: Vec<Role> = Vec::new();
        let mut failed = Vec::new();

        for definition in definitions {
            let name = definition.name.clone();
            let taken = imported.iter().any(|r| r.name == name) || self.roles.find_by_name(&name).await?.is_some();
            if taken {
                failed.push(RoleImportFailure {
                    name,
                    error: "Role with this name already exists".to_string(),
                });
                continue;
            }
            match Role::new(definition, provider, now) {
                Ok(role) => imported.push(role),
                Err(e) => failed.push(RoleImportFailure {
                    name,
                    error: e.to_string(),
                }),
            }
        }

        if !imported.is_empty() {
            self.roles.save_all(&imported).await.map_err(name_conflict)?;
        }

        info!(
            provider = provider.as_str(),
            imported = imported.len(),
            failed = failed.len(),
            "IAM roles imported"
        );
        self.event_bus.publish_role_event(RoleEvent::RolesImported {
            provider,
            imported: imported.len(),
            failed: failed.len(),
            imported_at: now,
        });
        Ok(RoleImportReport {
            provider,
            imported,
            failed,
        })
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User, ServiceError> {
        let user = User::new(new_user.email, new_user.name, new_user.hashed_password, self.clock.now())?;
        if self.users.find_by_email(&user.email).await?.is_some() {
            return Err(ServiceError::Conflict("User with this email already exists".to_string()));
        }
        self.users.save(&user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => ServiceError::Conflict("User with this email already exists".to_string()),
            other => other.into(),
        })?;

        info!(user_id = %user.id, "User created");
        self.event_bus.publish_role_event(RoleEvent::UserCreated {
            user_id: user.id,
            email: user.email.clone(),
            created_at: user.created_at,
        });
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, ServiceError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    pub async fn list_users(&self, page: Page) -> Result<Vec<User>, ServiceError> {
        Ok(self.users.list(page).await?)
    }

    /// Idempotent; assigning a held role returns the user unchanged.
    pub async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<User, ServiceError> {
        let mut user = self.get_user(user_id).await?;
        self.get_role(role_id).await?;

        let now = self.clock.now();
        if !user.assign_role(role_id, now) {
            return Ok(user);
        }
        self.users.save(&user).await.map_err(|e| match e {
            RepositoryError::ForeignKey(_) => ServiceError::not_found("Role", role_id),
            other => other.into(),
        })?;

        info!(user_id = %user_id, role_id = %role_id, "Role assigned");
        self.event_bus.publish_role_event(RoleEvent::RoleAssigned {
            user_id,
            role_id,
            assigned_at: now,
        });
        Ok(user)
    }

    pub async fn revoke_role(&self, user_id: UserId, role_id: RoleId) -> Result<User, ServiceError> {
        let mut user = self.get_user(user_id).await?;

        let now = self.clock.now();
        if !user.revoke_role(role_id, now) {
            return Ok(user);
        }
        self.users.save(&user).await?;

        info!(user_id = %user_id, role_id = %role_id, "Role revoked");
        self.event_bus.publish_role_event(RoleEvent::RoleRevoked {
            user_id,
            role_id,
            revoked_at: now,
        });
        Ok(user)
    }

    /// Assigns one role to many users, reporting each user separately.
    pub async fn assign_users_to_role(
        &self,
        role_id: RoleId,
        user_ids: Vec<UserId>,
    ) -> Result<RoleAssignmentReport, ServiceError> {
        self.get_role(role_id).await?;

        let mut assigned = Vec::new();
        let mut failed = Vec::new();
        for user_id in user_ids {
            match self.assign_role(user_id, role_id).await {
                Ok(_) => assigned.push(user_id),
                Err(e) => {
                    warn!(user_id = %user_id, role_id = %role_id, error = %e, "Role assignment failed");
                    failed.push(RoleAssignmentFailure {
                        user_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(RoleAssignmentReport {
            role_id,
            assigned,
            failed,
        })
    }

    /// Current role names of the user, read fresh from storage.
    pub async fn resolve_principal_roles(&self, user_id: UserId) -> Result<RoleSet, ServiceError> {
        self.get_user(user_id).await?;
        let names = self.users.role_names(user_id).await?;
        Ok(names.into_iter().collect())
    }

    async fn ensure_name_free(&self, name: &str, id: RoleId) -> Result<(), ServiceError> {
        match self.roles.find_by_name(name).await? {
            Some(existing) if existing.id != id => {
                warn!(name, "Role name already taken");
                Err(ServiceError::Conflict("Role with this name already exists".to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn name_conflict(err: RepositoryError) -> ServiceError {
    match err {
        RepositoryError::Conflict(_) => ServiceError::Conflict("Role with this name already exists".to_string()),
        other => other.into(),
    }
}
