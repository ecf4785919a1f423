// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Router HTTP server
//!
//! Wires configuration, storage, the activity recorder and the axum API
//! together and serves until Ctrl+C / SIGTERM.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use agent_router_core::application::{create_repositories, seed_sample_data, ActivityRecorder};
use agent_router_core::domain::clock::{Clock, SystemClock};
use agent_router_core::domain::repository::StorageBackend;
use agent_router_core::domain::router_config::RouterConfigManifest;
use agent_router_core::infrastructure::db::Database;
use agent_router_core::infrastructure::event_bus::EventBus;
use agent_router_core::presentation::api::{app, AppState, ExternalSources};

pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Load the sample catalogue on startup when storage is empty
    pub seed: bool,
}

pub async fn start_server(config: RouterConfigManifest, options: ServeOptions) -> Result<()> {
    config.validate().context("Configuration validation failed")?;

    info!(
        name = %config.metadata.name,
        environment = %config.spec.environment,
        "Configuration loaded"
    );

    if let Some(port) = config.spec.observability.metrics_port {
        install_metrics_exporter(port)?;
    }

    let backend = config.storage_backend()?;
    let pool = match &backend {
        StorageBackend::PostgreSQL(pg) => {
            let database = Database::new(&pg.connection_string, pg.max_connections).await?;
            database.migrate().await?;
            info!("Database migrations applied");
            Some(database.get_pool().clone())
        }
        StorageBackend::InMemory => {
            warn!("Using in-memory storage; data is lost on shutdown");
            None
        }
    };
    let repositories = create_repositories(&backend, pool)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let event_bus = Arc::new(EventBus::with_default_capacity());

    if options.seed {
        let summary = seed_sample_data(&repositories, clock.as_ref())
            .await
            .context("Failed to seed sample data")?;
        if summary.skipped {
            info!("Storage already populated, seed skipped");
        } else {
            info!(routes = summary.routes, agents = summary.agents, "Sample data seeded");
        }
    }

    let recorder = ActivityRecorder::new(repositories.activity.clone(), event_bus.clone()).start();

    let state = AppState::new(
        &repositories,
        clock,
        event_bus,
        ExternalSources::static_sources(&config.spec.discovery),
    );
    let router = app(Arc::new(state));

    let host = options.host.unwrap_or_else(|| config.spec.server.host.clone());
    let port = options.port.unwrap_or(config.spec.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Router listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // The router owned the last event bus handles; once they drop the
    // recorder drains and exits.
    if let Err(e) = recorder.await {
        warn!("Activity recorder ended abnormally: {}", e);
    }

    info!("Router shut down");

    Ok(())
}

fn install_metrics_exporter(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!("Prometheus metrics exposed on {}", addr);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
