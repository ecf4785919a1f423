// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Load the sample catalogue into the configured store

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use agent_router_core::application::{create_repositories, seed_sample_data};
use agent_router_core::domain::clock::SystemClock;
use agent_router_core::domain::repository::StorageBackend;
use agent_router_core::domain::router_config::RouterConfigManifest;
use agent_router_core::infrastructure::db::Database;

pub async fn execute(config_override: Option<PathBuf>) -> Result<()> {
    let config = RouterConfigManifest::load_or_default(config_override).context("Failed to load configuration")?;

    let backend = config.storage_backend()?;
    let pool = match &backend {
        StorageBackend::PostgreSQL(pg) => {
            let database = Database::new(&pg.connection_string, pg.max_connections).await?;
            database.migrate().await?;
            Some(database.get_pool().clone())
        }
        StorageBackend::InMemory => {
            println!(
                "{}",
                "In-memory storage configured; use `serve --seed` to seed a running server".yellow()
            );
            return Ok(());
        }
    };

    let repositories = create_repositories(&backend, pool)?;
    let summary = seed_sample_data(&repositories, &SystemClock)
        .await
        .context("Failed to seed sample data")?;

    if summary.skipped {
        println!("{}", "Database already contains agents; seed skipped".yellow());
        return Ok(());
    }

    println!("{}", "✓ Sample data loaded".green());
    println!("  Agents: {}", summary.agents);
    println!("  Features: {}", summary.features);
    println!("  Roles: {}", summary.roles);
    println!("  Conditions: {}", summary.conditions);
    println!("  Routes: {}", summary.routes);
    Ok(())
}
