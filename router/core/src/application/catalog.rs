// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent and Feature Catalog Services
//!
//! CRUD for the two things a route binds, plus discovery from external
//! registries and agent health checks. Every call out to a
//! [`DiscoverySource`] or [`HealthProbe`] is bounded by the configured
//! timeout; nothing is retried.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::application::errors::ServiceError;
use crate::application::repository_factory::Repositories;
use crate::domain::agent::{Agent, AgentDefinition, AgentHealth, AgentId, AgentSourceType};
use crate::domain::clock::Clock;
use crate::domain::discovery::{DiscoveryError, DiscoverySource, HealthProbe};
use crate::domain::events::CatalogEvent;
use crate::domain::feature::{Feature, FeatureDefinition, FeatureId, StoreType};
use crate::domain::repository::{AgentRepository, FeatureRepository, Page, RepositoryError};
use crate::infrastructure::event_bus::EventBus;

/// Outcome of an agent health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHealthReport {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub status: AgentHealth,
    pub endpoint: String,
    pub checked_at: DateTime<Utc>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<T, DiscoveryError>>,
) -> Result<T, DiscoveryError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| DiscoveryError::Timeout {
            operation,
            seconds: limit.as_secs(),
        })?
}

fn referenced(err: RepositoryError, what: &str) -> ServiceError {
    match err {
        RepositoryError::ForeignKey(_) => ServiceError::Conflict(format!("{what} is referenced by one or more routes")),
        other => other.into(),
    }
}

pub struct AgentCatalogService {
    agents: Arc<dyn AgentRepository>,
    discovery: Arc<dyn DiscoverySource>,
    health: Arc<dyn HealthProbe>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    event_bus: Arc<EventBus>,
}

impl AgentCatalogService {
    pub fn new(
        repositories: &Repositories,
        discovery: Arc<dyn DiscoverySource>,
        health: Arc<dyn HealthProbe>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            agents: repositories.agents.clone(),
            discovery,
            health,
            timeout,
            clock,
            event_bus,
        }
    }

    pub async fn list_agents(&self, page: Page) -> Result<Vec<Agent>, ServiceError> {
        Ok(self.agents.list(page).await?)
    }

    pub async fn get_agent(&self, id: AgentId) -> Result<Agent, ServiceError> {
        self.agents
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Agent", id))
    }

    pub async fn create_agent(&self, definition: AgentDefinition) -> Result<Agent, ServiceError> {
        let agent = Agent::new(definition, self.clock.now())?;
        self.agents.save(&agent).await?;

        info!(agent_id = %agent.id, name = %agent.name, source_type = agent.source_type.as_str(), "Agent registered");
        self.event_bus.publish_catalog_event(CatalogEvent::AgentRegistered {
            agent_id: agent.id,
            name: agent.name.clone(),
            source_type: agent.source_type,
            registered_at: agent.created_at,
        });
        Ok(agent)
    }

    pub async fn update_agent(&self, id: AgentId, definition: AgentDefinition) -> Result<Agent, ServiceError> {
        let mut agent = self.get_agent(id).await?;
        agent.apply(definition, self.clock.now())?;
        self.agents.save(&agent).await?;

        info!(agent_id = %id, "Agent updated");
        self.event_bus.publish_catalog_event(CatalogEvent::AgentUpdated {
            agent_id: id,
            updated_at: agent.updated_at,
        });
        Ok(agent)
    }

    /// Refused while any route still points at the agent.
    pub async fn delete_agent(&self, id: AgentId) -> Result<(), ServiceError> {
        match self.agents.delete(id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound(_)) => return Err(ServiceError::not_found("Agent", id)),
            Err(e) => {
                warn!(agent_id = %id, error = %e, "Agent delete refused");
                return Err(referenced(e, "Agent"));
            }
        }

        info!(agent_id = %id, "Agent deleted");
        self.event_bus.publish_catalog_event(CatalogEvent::AgentRemoved {
            agent_id: id,
            removed_at: self.clock.now(),
        });
        Ok(())
    }

    /// Pulls agent definitions from the source and stores them in one batch.
    pub async fn discover_agents(&self, source_type: AgentSourceType) -> Result<Vec<Agent>, ServiceError> {
        info!(source_type = source_type.as_str(), "Discovering agents");
        let definitions = bounded("agent discovery", self.timeout, self.discovery.discover_agents(source_type)).await?;

        let now = self.clock.now();
        let agents = definitions
            .into_iter()
            .map(|definition| Agent::new(definition, now))
            .collect::<Result<Vec<_>, _>>()?;
        self.agents.save_all(&agents).await?;

        info!(source_type = source_type.as_str(), count = agents.len(), "Agents discovered");
        self.event_bus.publish_catalog_event(CatalogEvent::AgentsDiscovered {
            source_type,
            count: agents.len(),
            discovered_at: now,
        });
        Ok(agents)
    }

    /// Probes the agent and records the result on it. A probe that errors or
    /// times out marks the agent unhealthy.
    pub async fn check_agent_health(&self, id: AgentId) -> Result<AgentHealthReport, ServiceError> {
        let mut agent = self.get_agent(id).await?;

        let started = std::time::Instant::now();
        let outcome = bounded("agent health check", self.timeout, self.health.probe(&agent)).await;
        let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (status, error) = match outcome {
            Ok(health) => (health, None),
            Err(e) => {
                warn!(agent_id = %id, error = %e, "Agent health probe failed");
                (AgentHealth::Unhealthy, Some(e.to_string()))
            }
        };

        let now = self.clock.now();
        agent.record_health(status, now);
        self.agents.save(&agent).await?;

        debug!(agent_id = %id, health = status.as_str(), "Agent health recorded");
        self.event_bus.publish_catalog_event(CatalogEvent::AgentHealthChecked {
            agent_id: id,
            health: status,
            checked_at: now,
        });
        Ok(AgentHealthReport {
            agent_id: id,
            agent_name: agent.name,
            status,
            endpoint: agent.endpoint,
            checked_at: now,
            response_time_ms,
            error,
        })
    }
}

pub struct FeatureCatalogService {
    features: Arc<dyn FeatureRepository>,
    discovery: Arc<dyn DiscoverySource>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    event_bus: Arc<EventBus>,
}

impl FeatureCatalogService {
    pub fn new(
        repositories: &Repositories,
        discovery: Arc<dyn DiscoverySource>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            features: repositories.features.clone(),
            discovery,
            timeout,
            clock,
            event_bus,
        }
    }

    pub async fn list_features(&self, page: Page) -> Result<Vec<Feature>, ServiceError> {
        Ok(self.features.list(page).await?)
    }

    pub async fn get_feature(&self, id: FeatureId) -> Result<Feature, ServiceError> {
        self.features
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Feature", id))
    }

    pub async fn create_feature(&self, definition: FeatureDefinition) -> Result<Feature, ServiceError> {
        let feature = Feature::new(definition, self.clock.now())?;
        self.features.save(&feature).await?;

        info!(feature_id = %feature.id, name = %feature.name, store_type = feature.store_type.as_str(), "Feature registered");
        self.event_bus.publish_catalog_event(CatalogEvent::FeatureRegistered {
            feature_id: feature.id,
            name: feature.name.clone(),
            store_type: feature.store_type,
            registered_at: feature.created_at,
        });
        Ok(feature)
    }

    pub async fn update_feature(&self, id: FeatureId, definition: FeatureDefinition) -> Result<Feature, ServiceError> {
        let mut feature = self.get_feature(id).await?;
        feature.apply(definition, self.clock.now())?;
        self.features.save(&feature).await?;

        info!(feature_id = %id, "Feature updated");
        self.event_bus.publish_catalog_event(CatalogEvent::FeatureUpdated {
            feature_id: id,
            updated_at: feature.updated_at,
        });
        Ok(feature)
    }

    pub async fn delete_feature(&self, id: FeatureId) -> Result<(), ServiceError> {
        match self.features.delete(id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound(_)) => return Err(ServiceError::not_found("Feature", id)),
            Err(e) => {
                warn!(feature_id = %id, error = %e, "Feature delete refused");
                return Err(referenced(e, "Feature"));
            }
        }

        info!(feature_id = %id, "Feature deleted");
        self.event_bus.publish_catalog_event(CatalogEvent::FeatureRemoved {
            feature_id: id,
            removed_at: self.clock.now(),
        });
        Ok(())
    }

    pub async fn discover_features(&self, store_type: StoreType) -> Result<Vec<Feature>, ServiceError> {
        info!(store_type = store_type.as_str(), "Discovering features");
        let definitions = bounded("feature discovery", self.timeout, self.discovery.discover_features(store_type)).await?;

        let now = self.clock.now();
        let features = definitions
            .into_iter()
            .map(|definition| Feature::new(definition, now))
            .collect::<Result<Vec<_>, _>>()?;
        self.features.save_all(&features).await?;

        info!(store_type = store_type.as_str(), count = features.len(), "Features discovered");
        self.event_bus.publish_catalog_event(CatalogEvent::FeaturesDiscovered {
            store_type,
            count: features.len(),
            discovered_at: now,
        });
        Ok(features)
    }
}
