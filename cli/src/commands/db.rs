// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Database maintenance commands

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use agent_router_core::domain::repository::StorageBackend;
use agent_router_core::domain::router_config::RouterConfigManifest;
use agent_router_core::infrastructure::db::Database;

#[derive(Subcommand)]
pub enum DbCommand {
    /// Apply pending schema migrations
    Migrate,
}

pub async fn handle_command(command: DbCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        DbCommand::Migrate => migrate(config_override).await,
    }
}

async fn migrate(config_override: Option<PathBuf>) -> Result<()> {
    let config = RouterConfigManifest::load_or_default(config_override).context("Failed to load configuration")?;

    let StorageBackend::PostgreSQL(pg) = config.storage_backend()? else {
        println!("{}", "In-memory storage configured; nothing to migrate".yellow());
        return Ok(());
    };

    let database = Database::new(&pg.connection_string, pg.max_connections).await?;
    database.migrate().await?;

    println!("{}", "✓ Migrations applied".green());
    Ok(())
}
