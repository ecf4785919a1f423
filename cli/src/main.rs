// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Agent Router CLI
//!
//! The `agent-router` binary runs the routing-policy server and offers
//! operator commands against its configuration, database and API.
//!
//! ## Commands
//!
//! - `agent-router serve` - Run the HTTP API
//! - `agent-router config show|validate|generate` - Configuration management
//! - `agent-router db migrate` - Apply schema migrations
//! - `agent-router seed` - Load the sample catalogue
//! - `agent-router route list|test` - Inspect routes on a running server

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use agent_router::commands::{self, ConfigCommand, DbCommand, RouteCommand};
use agent_router::server::{self, ServeOptions};
use agent_router_core::domain::router_config::RouterConfigManifest;

const DEFAULT_PORT: u16 = 8000;

/// Agent Router - role-based access routing between agents and features
#[derive(Parser)]
#[command(name = "agent-router")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "ROUTER_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server host used by client commands
    #[arg(long, global = true, env = "ROUTER_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Server port (overrides spec.server.port; client commands default to 8000)
    #[arg(long, global = true, env = "ROUTER_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "ROUTER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind address (overrides spec.server.host)
        #[arg(long)]
        bind: Option<String>,

        /// Load sample data when storage is empty
        #[arg(long)]
        seed: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },

    /// Load the sample catalogue into the configured database
    Seed,

    /// Route inspection against a running server
    Route {
        #[command(subcommand)]
        command: RouteCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Serve { bind, seed } => {
            let config = RouterConfigManifest::load_or_default(cli.config).context("Failed to load configuration")?;
            let options = ServeOptions {
                host: bind,
                port: cli.port,
                seed,
            };
            server::start_server(config, options).await
        }
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
        Commands::Db { command } => commands::db::handle_command(command, cli.config).await,
        Commands::Seed => commands::seed::execute(cli.config).await,
        Commands::Route { command } => {
            commands::route::handle_command(command, &cli.host, cli.port.unwrap_or(DEFAULT_PORT)).await
        },
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
