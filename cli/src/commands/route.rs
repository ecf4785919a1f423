// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Route inspection against a running server

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use uuid::Uuid;

use crate::client::RouterClient;

#[derive(Subcommand)]
pub enum RouteCommand {
    /// List configured routes
    List {
        #[arg(long, default_value = "0")]
        skip: usize,

        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Dry-run access evaluation for a role set
    Test {
        /// Route ID
        route_id: Uuid,

        /// Roles held by the caller (repeatable)
        #[arg(short, long = "role")]
        roles: Vec<String>,
    },
}

pub async fn handle_command(command: RouteCommand, host: &str, port: u16) -> Result<()> {
    let client = RouterClient::for_server(host, port)?;

    if !client.health().await? {
        anyhow::bail!("Router is not reachable at {}:{}. Start it with `agent-router serve`.", host, port);
    }

    match command {
        RouteCommand::List { skip, limit } => list(&client, skip, limit).await,
        RouteCommand::Test { route_id, roles } => test(&client, route_id, roles).await,
    }
}

async fn list(client: &RouterClient, skip: usize, limit: usize) -> Result<()> {
    let list = client.list_routes(skip, limit).await?;

    if list.routes.is_empty() {
        println!("{}", "No routes configured".dimmed());
        return Ok(());
    }

    println!("{}", format!("Routes ({}):", list.total).bold());
    for route in &list.routes {
        let kind = if route.conditional { "conditional" } else { "static" };
        println!(
            "  {}  agent={} feature={} {} {}",
            route.id.to_string().bold(),
            route.agent_id,
            route.feature_id,
            kind,
            route.status.to_string().dimmed()
        );
    }
    Ok(())
}

async fn test(client: &RouterClient, route_id: Uuid, roles: Vec<String>) -> Result<()> {
    let report = client.test_route(route_id, roles).await?;

    let verdict = if report.allowed {
        "ALLOW".green().bold()
    } else {
        "DENY".red().bold()
    };
    println!("{} {}", verdict, report.reason);
    println!("  Evaluated at: {}", report.evaluated_at);
    println!("  Response time: {:.2}ms", report.response_time);
    for check in &report.details.checks {
        let mark = if check.satisfied { "✓".green() } else { "✗".red() };
        println!("  {} {} ({})", mark, check.name, check.condition_type);
    }
    Ok(())
}
