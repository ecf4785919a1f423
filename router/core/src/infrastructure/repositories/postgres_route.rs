// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Route Repository
//!
//! A route is one `routes` row (rules as JSONB) plus one `route_conditions`
//! link per attached condition; the link `position` preserves attachment
//! order. Catalog `conditions` rows are never rewritten from here.
//!
//! Writes to an existing route are conditional on the row still being there:
//! plain updates use `UPDATE ... WHERE id = $1`, link changes lock the row
//! with `SELECT ... FOR UPDATE` first. Either way a route deleted in the
//! meantime yields `NotFound` instead of being recreated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use super::postgres_condition::{condition_from_row, insert as insert_condition};
use crate::domain::agent::AgentId;
use crate::domain::condition::{Condition, ConditionId};
use crate::domain::feature::FeatureId;
use crate::domain::repository::{Page, RepositoryError, RouteRepository};
use crate::domain::route::{Route, RouteId, RouteStatus};

pub struct PostgresRouteRepository {
    pool: PgPool,
}

impl PostgresRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_conditions(&self, route_id: Uuid) -> Result<Vec<Condition>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.description, c.condition_type, c.condition_data,
                   c.created_at, c.updated_at
            FROM route_conditions rc
            JOIN conditions c ON c.id = rc.condition_id
            WHERE rc.route_id = $1
            ORDER BY rc.position ASC
            "#,
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(condition_from_row).collect()
    }

    async fn hydrate(&self, row: &PgRow) -> Result<Route, RepositoryError> {
        let mut route = route_from_row(row)?;
        route.conditions = self.load_conditions(route.id.0).await?;
        Ok(route)
    }
}

fn route_from_row(row: &PgRow) -> Result<Route, RepositoryError> {
    let rules: serde_json::Value = row.try_get("rules")?;
    let status: String = row.try_get("status")?;

    Ok(Route {
        id: RouteId(row.try_get("id")?),
        feature_id: FeatureId(row.try_get("feature_id")?),
        agent_id: AgentId(row.try_get("agent_id")?),
        rules: serde_json::from_value(rules)?,
        conditional: row.try_get("conditional")?,
        status: status
            .parse()
            .map_err(|e| RepositoryError::Serialization(format!("routes.status: {e}")))?,
        conditions: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn missing_route(id: RouteId) -> RepositoryError {
    RepositoryError::NotFound(format!("route {id}"))
}

/// Lock the route row for the rest of the transaction, returning its status
async fn lock_route(conn: &mut PgConnection, id: RouteId) -> Result<String, RepositoryError> {
    let row = sqlx::query("SELECT status FROM routes WHERE id = $1 FOR UPDATE")
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| missing_route(id))?;
    Ok(row.try_get("status")?)
}

async fn touch_route(conn: &mut PgConnection, id: RouteId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE routes SET updated_at = $2 WHERE id = $1")
        .bind(id.0)
        .bind(at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn link_condition(
    conn: &mut PgConnection,
    id: RouteId,
    condition_id: ConditionId,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r#"
        INSERT INTO route_conditions (route_id, condition_id, position)
        SELECT $1, $2, COALESCE(MAX(position) + 1, 0)
        FROM route_conditions
        WHERE route_id = $1
        ON CONFLICT (route_id, condition_id) DO NOTHING
        "#,
    )
    .bind(id.0)
    .bind(condition_id.0)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl RouteRepository for PostgresRouteRepository {
    async fn insert(&self, route: &Route) -> Result<(), RepositoryError> {
        let rules = serde_json::to_value(&route.rules)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO routes (
                id, feature_id, agent_id, rules, conditional, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(route.id.0)
        .bind(route.feature_id.0)
        .bind(route.agent_id.0)
        .bind(rules)
        .bind(route.conditional)
        .bind(route.status.as_str())
        .bind(route.created_at)
        .bind(route.updated_at)
        .execute(&mut *tx)
        .await?;

        for condition in &route.conditions {
            link_condition(&mut tx, route.id, condition.id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, route: &Route) -> Result<(), RepositoryError> {
        let rules = serde_json::to_value(&route.rules)?;
        let result = sqlx::query(
            r#"
            UPDATE routes SET
                feature_id = $2,
                agent_id = $3,
                rules = $4,
                conditional = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(route.id.0)
        .bind(route.feature_id.0)
        .bind(route.agent_id.0)
        .bind(rules)
        .bind(route.conditional)
        .bind(route.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(missing_route(route.id));
        }
        Ok(())
    }

    async fn set_status(&self, id: RouteId, status: RouteStatus, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        if lock_route(&mut tx, id).await? == status.as_str() {
            return Ok(false);
        }

        sqlx::query("UPDATE routes SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.0)
            .bind(status.as_str())
            .bind(at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn attach_condition(
        &self,
        id: RouteId,
        condition_id: ConditionId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_route(&mut tx, id).await?;
        if !link_condition(&mut tx, id, condition_id).await? {
            return Ok(false);
        }
        touch_route(&mut tx, id, at).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn add_condition(&self, id: RouteId, condition: &Condition, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_route(&mut tx, id).await?;
        insert_condition(&mut *tx, condition).await?;
        link_condition(&mut tx, id, condition.id).await?;
        touch_route(&mut tx, id, at).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn detach_condition(
        &self,
        id: RouteId,
        condition_id: ConditionId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_route(&mut tx, id).await?;
        let result = sqlx::query("DELETE FROM route_conditions WHERE route_id = $1 AND condition_id = $2")
            .bind(id.0)
            .bind(condition_id.0)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        touch_route(&mut tx, id, at).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn find_by_id(&self, id: RouteId) -> Result<Option<Route>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, feature_id, agent_id, rules, conditional, status, created_at, updated_at
            FROM routes
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, page: Page) -> Result<Vec<Route>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, feature_id, agent_id, rules, conditional, status, created_at, updated_at
            FROM routes
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.sql_limit())
        .bind(page.sql_offset())
        .fetch_all(&self.pool)
        .await?;

        let mut routes = Vec::with_capacity(rows.len());
        for row in &rows {
            routes.push(self.hydrate(row).await?);
        }
        Ok(routes)
    }

    async fn delete(&self, id: RouteId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(missing_route(id));
        }
        Ok(())
    }
}
