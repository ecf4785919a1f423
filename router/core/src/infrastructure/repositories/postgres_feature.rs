// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `FeatureRepository` over the `features` table.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{PgExecutor, Row};

use crate::domain::feature::{Feature, FeatureId};
use crate::domain::repository::{FeatureRepository, Page, RepositoryError};

pub struct PostgresFeatureRepository {
    pool: PgPool,
}

impl PostgresFeatureRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn upsert<'e, E: PgExecutor<'e>>(executor: E, feature: &Feature) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        INSERT INTO features (
            id, name, description, store_type, url, token,
            status, config_data, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            store_type = EXCLUDED.store_type,
            url = EXCLUDED.url,
            token = EXCLUDED.token,
            status = EXCLUDED.status,
            config_data = EXCLUDED.config_data,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(feature.id.0)
    .bind(&feature.name)
    .bind(&feature.description)
    .bind(feature.store_type.as_str())
    .bind(&feature.url)
    .bind(&feature.token)
    .bind(feature.status.as_str())
    .bind(serde_json::Value::Object(feature.config_data.clone()))
    .bind(feature.created_at)
    .bind(feature.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

fn feature_from_row(row: &PgRow) -> Result<Feature, RepositoryError> {
    let store_type: String = row.try_get("store_type")?;
    let status: String = row.try_get("status")?;
    let config: serde_json::Value = row.try_get("config_data")?;

    Ok(Feature {
        id: FeatureId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        store_type: store_type
            .parse()
            .map_err(|e| RepositoryError::Serialization(format!("features.store_type: {e}")))?,
        url: row.try_get("url")?,
        token: row.try_get("token")?,
        status: status
            .parse()
            .map_err(|e| RepositoryError::Serialization(format!("features.status: {e}")))?,
        config_data: match config {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl FeatureRepository for PostgresFeatureRepository {
    async fn save(&self, feature: &Feature) -> Result<(), RepositoryError> {
        upsert(&self.pool, feature).await
    }

    async fn save_all(&self, features: &[Feature]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for feature in features {
            upsert(&mut *tx, feature).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: FeatureId) -> Result<Option<Feature>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, store_type, url, token,
                   status, config_data, created_at, updated_at
            FROM features
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(feature_from_row).transpose()
    }

    async fn list(&self, page: Page) -> Result<Vec<Feature>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, store_type, url, token,
                   status, config_data, created_at, updated_at
            FROM features
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.sql_limit())
        .bind(page.sql_offset())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(feature_from_row).collect()
    }

    async fn delete(&self, id: FeatureId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM features WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("feature {id}")));
        }
        Ok(())
    }
}
