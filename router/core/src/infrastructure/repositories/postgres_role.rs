// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `RoleRepository` over the `roles` table. Name uniqueness is
//! enforced by `roles_name_key`; memberships in `user_roles` cascade on
//! delete.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{PgExecutor, Row};

use crate::domain::repository::{RepositoryError, RoleRepository};
use crate::domain::role::{Role, RoleId};

const SELECT_ROLE: &str = r#"
    SELECT id, name, description, permissions, is_custom, source,
           config_data, created_at, updated_at
    FROM roles
"#;

pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn upsert<'e, E: PgExecutor<'e>>(executor: E, role: &Role) -> Result<(), RepositoryError> {
    let permissions = serde_json::to_value(&role.permissions)?;

    sqlx::query(
        r#"
        INSERT INTO roles (
            id, name, description, permissions, is_custom, source,
            config_data, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            permissions = EXCLUDED.permissions,
            config_data = EXCLUDED.config_data,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(role.id.0)
    .bind(&role.name)
    .bind(&role.description)
    .bind(permissions)
    .bind(role.is_custom)
    .bind(role.source.as_str())
    .bind(serde_json::Value::Object(role.config_data.clone()))
    .bind(role.created_at)
    .bind(role.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

fn role_from_row(row: &PgRow) -> Result<Role, RepositoryError> {
    let permissions: serde_json::Value = row.try_get("permissions")?;
    let source: String = row.try_get("source")?;
    let config: serde_json::Value = row.try_get("config_data")?;

    Ok(Role {
        id: RoleId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        permissions: serde_json::from_value(permissions)?,
        is_custom: row.try_get("is_custom")?,
        source: source
            .parse()
            .map_err(|e| RepositoryError::Serialization(format!("roles.source: {e}")))?,
        config_data: match config {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn save(&self, role: &Role) -> Result<(), RepositoryError> {
        upsert(&self.pool, role).await
    }

    async fn save_all(&self, roles: &[Role]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for role in roles {
            upsert(&mut *tx, role).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_ROLE} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(role_from_row).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_ROLE} WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(role_from_row).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Role>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_ROLE} ORDER BY name ASC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(role_from_row).collect()
    }

    async fn delete(&self, id: RoleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("role {id}")));
        }
        Ok(())
    }
}
