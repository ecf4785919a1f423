// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Agent Repository
//!
//! `AgentRepository` backed by the `agents` table. Deleting an agent still
//! referenced by a route fails on `routes_agent_id_fkey` and surfaces as
//! `RepositoryError::ForeignKey`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{PgExecutor, Row};

use crate::domain::agent::{Agent, AgentId};
use crate::domain::repository::{AgentRepository, Page, RepositoryError};

pub struct PostgresAgentRepository {
    pool: PgPool,
}

impl PostgresAgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn upsert<'e, E: PgExecutor<'e>>(executor: E, agent: &Agent) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        INSERT INTO agents (
            id, name, description, source_type, endpoint, api_key,
            status, health, config_data, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            source_type = EXCLUDED.source_type,
            endpoint = EXCLUDED.endpoint,
            api_key = EXCLUDED.api_key,
            status = EXCLUDED.status,
            health = EXCLUDED.health,
            config_data = EXCLUDED.config_data,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(agent.id.0)
    .bind(&agent.name)
    .bind(&agent.description)
    .bind(agent.source_type.as_str())
    .bind(&agent.endpoint)
    .bind(&agent.api_key)
    .bind(agent.status.as_str())
    .bind(agent.health.as_str())
    .bind(serde_json::Value::Object(agent.config_data.clone()))
    .bind(agent.created_at)
    .bind(agent.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

fn agent_from_row(row: &PgRow) -> Result<Agent, RepositoryError> {
    let source_type: String = row.try_get("source_type")?;
    let status: String = row.try_get("status")?;
    let health: String = row.try_get("health")?;
    let config: serde_json::Value = row.try_get("config_data")?;

    Ok(Agent {
        id: AgentId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        source_type: source_type
            .parse()
            .map_err(|e| RepositoryError::Serialization(format!("agents.source_type: {e}")))?,
        endpoint: row.try_get("endpoint")?,
        api_key: row.try_get("api_key")?,
        status: status
            .parse()
            .map_err(|e| RepositoryError::Serialization(format!("agents.status: {e}")))?,
        health: health
            .parse()
            .map_err(|e| RepositoryError::Serialization(format!("agents.health: {e}")))?,
        config_data: match config {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError> {
        upsert(&self.pool, agent).await
    }

    async fn save_all(&self, agents: &[Agent]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for agent in agents {
            upsert(&mut *tx, agent).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, source_type, endpoint, api_key,
                   status, health, config_data, created_at, updated_at
            FROM agents
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn list(&self, page: Page) -> Result<Vec<Agent>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, source_type, endpoint, api_key,
                   status, health, config_data, created_at, updated_at
            FROM agents
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.sql_limit())
        .bind(page.sql_offset())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(agent_from_row).collect()
    }

    async fn delete(&self, id: AgentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("agent {id}")));
        }
        Ok(())
    }
}
