// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `ConditionRepository`. The payload is stored as JSONB next to
//! its type tag and re-validated through `ConditionRule::parse` on read.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{PgExecutor, Row};

use crate::domain::condition::{Condition, ConditionId, ConditionRule};
use crate::domain::repository::{ConditionRepository, RepositoryError};

pub struct PostgresConditionRepository {
    pool: PgPool,
}

impl PostgresConditionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn upsert<'e, E: PgExecutor<'e>>(
    executor: E,
    condition: &Condition,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        INSERT INTO conditions (
            id, name, description, condition_type, condition_data, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            condition_type = EXCLUDED.condition_type,
            condition_data = EXCLUDED.condition_data,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(condition.id.0)
    .bind(&condition.name)
    .bind(&condition.description)
    .bind(condition.rule.type_name())
    .bind(condition.rule.payload())
    .bind(condition.created_at)
    .bind(condition.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Insert a new condition; the route repository calls this inside the
/// transaction that also links it.
pub(crate) async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    condition: &Condition,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        INSERT INTO conditions (
            id, name, description, condition_type, condition_data, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(condition.id.0)
    .bind(&condition.name)
    .bind(&condition.description)
    .bind(condition.rule.type_name())
    .bind(condition.rule.payload())
    .bind(condition.created_at)
    .bind(condition.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) fn condition_from_row(row: &PgRow) -> Result<Condition, RepositoryError> {
    let condition_type: String = row.try_get("condition_type")?;
    let data: serde_json::Value = row.try_get("condition_data")?;
    let rule = ConditionRule::parse(&condition_type, data)
        .map_err(|e| RepositoryError::Serialization(format!("conditions.condition_data: {e}")))?;

    Ok(Condition {
        id: ConditionId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        rule,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ConditionRepository for PostgresConditionRepository {
    async fn save(&self, condition: &Condition) -> Result<(), RepositoryError> {
        upsert(&self.pool, condition).await
    }

    async fn find_by_id(&self, id: ConditionId) -> Result<Option<Condition>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, condition_type, condition_data, created_at, updated_at
            FROM conditions
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(condition_from_row).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Condition>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, condition_type, condition_data, created_at, updated_at
            FROM conditions
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(condition_from_row).collect()
    }

    async fn delete(&self, id: ConditionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM conditions WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("condition {id}")));
        }
        Ok(())
    }
}
