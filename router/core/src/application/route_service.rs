// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Route Service
//!
//! Lifecycle of routes and their condition attachments.
//!
//! Create and update check that the agent exists, then that the feature
//! exists, before anything is written. The repository still enforces the
//! same references on write; a foreign key failure raised there is reported
//! as the matching `AgentNotFound` / `FeatureNotFound`.
//!
//! Every change to an existing route is a single repository call that
//! re-checks the route under its own lock or transaction, so a route deleted
//! concurrently is reported as not found rather than written back. The
//! route returned afterwards is re-read from storage.
//!
//! Attaching an already attached condition and detaching one that is not
//! attached both return the route unchanged without writing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::application::errors::ServiceError;
use crate::application::repository_factory::Repositories;
use crate::domain::clock::Clock;
use crate::domain::condition::{Condition, ConditionId, ConditionSpec};
use crate::domain::events::RouteEvent;
use crate::domain::repository::{
    AgentRepository, ConditionRepository, FeatureRepository, Page, RepositoryError, RouteRepository,
    ROUTE_AGENT_FK, ROUTE_CONDITION_FK, ROUTE_FEATURE_FK,
};
use crate::domain::route::{Route, RouteDraft, RouteId, RouteStatus};
use crate::infrastructure::event_bus::EventBus;

/// Outcome of a bulk create; every entry is attempted independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRouteReport {
    pub created: Vec<Route>,
    pub failed: Vec<BulkRouteFailure>,
    pub total_created: usize,
    pub total_failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRouteFailure {
    /// Position of the entry in the request
    pub index: usize,
    pub route: RouteDraft,
    pub error: String,
}

pub struct RouteService {
    routes: Arc<dyn RouteRepository>,
    conditions: Arc<dyn ConditionRepository>,
    agents: Arc<dyn AgentRepository>,
    features: Arc<dyn FeatureRepository>,
    clock: Arc<dyn Clock>,
    event_bus: Arc<EventBus>,
}

fn count_mutation(op: &'static str) {
    metrics::counter!("router_route_mutations_total", "op" => op).increment(1);
}

impl RouteService {
    pub fn new(repositories: &Repositories, clock: Arc<dyn Clock>, event_bus: Arc<EventBus>) -> Self {
        Self {
            routes: repositories.routes.clone(),
            conditions: repositories.conditions.clone(),
            agents: repositories.agents.clone(),
            features: repositories.features.clone(),
            clock,
            event_bus,
        }
    }

    pub async fn create_route(&self, draft: RouteDraft) -> Result<Route, ServiceError> {
        self.check_references(&draft).await?;

        let route = Route::new(draft, self.clock.now())?;
        self.routes
            .insert(&route)
            .await
            .map_err(|e| reference_error(e, &route))?;

        info!(
            route_id = %route.id,
            agent_id = %route.agent_id,
            feature_id = %route.feature_id,
            conditional = route.conditional,
            "Route created"
        );
        count_mutation("create");
        self.event_bus.publish_route_event(RouteEvent::RouteCreated {
            route_id: route.id,
            feature_id: route.feature_id,
            agent_id: route.agent_id,
            created_at: route.created_at,
        });
        Ok(route)
    }

    pub async fn update_route(&self, id: RouteId, draft: RouteDraft) -> Result<Route, ServiceError> {
        let mut route = self.load(id).await?;
        self.check_references(&draft).await?;

        route.apply(draft, self.clock.now())?;
        self.routes.update(&route).await.map_err(|e| match e {
            RepositoryError::NotFound(_) => ServiceError::not_found("Route", id),
            other => reference_error(other, &route),
        })?;

        info!(route_id = %route.id, "Route updated");
        count_mutation("update");
        self.event_bus.publish_route_event(RouteEvent::RouteUpdated {
            route_id: route.id,
            updated_at: route.updated_at,
        });
        Ok(route)
    }

    pub async fn delete_route(&self, id: RouteId) -> Result<(), ServiceError> {
        match self.routes.delete(id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound(_)) => return Err(ServiceError::not_found("Route", id)),
            Err(e) => return Err(e.into()),
        }

        info!(route_id = %id, "Route deleted");
        count_mutation("delete");
        self.event_bus.publish_route_event(RouteEvent::RouteDeleted {
            route_id: id,
            deleted_at: self.clock.now(),
        });
        Ok(())
    }

    pub async fn get_route(&self, id: RouteId) -> Result<Route, ServiceError> {
        debug!(route_id = %id, "Loading route");
        self.load(id).await
    }

    pub async fn list_routes(&self, page: Page) -> Result<Vec<Route>, ServiceError> {
        Ok(self.routes.list(page).await?)
    }

    pub async fn set_route_status(&self, id: RouteId, status: RouteStatus) -> Result<Route, ServiceError> {
        let changed = self
            .routes
            .set_status(id, status, self.clock.now())
            .await
            .map_err(|e| route_error(e, id))?;
        let route = self.load(id).await?;
        if !changed {
            return Ok(route);
        }

        info!(route_id = %id, status = status.as_str(), "Route status changed");
        count_mutation("set_status");
        self.event_bus.publish_route_event(RouteEvent::RouteStatusChanged {
            route_id: id,
            status,
            changed_at: route.updated_at,
        });
        Ok(route)
    }

    pub async fn bulk_create_routes(&self, drafts: Vec<RouteDraft>) -> BulkRouteReport {
        let mut created = Vec::new();
        let mut failed = Vec::new();

        for (index, draft) in drafts.into_iter().enumerate() {
            match self.create_route(draft.clone()).await {
                Ok(route) => created.push(route),
                Err(e) => {
                    warn!(index, error = %e, "Bulk route entry rejected");
                    failed.push(BulkRouteFailure {
                        index,
                        route: draft,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(created = created.len(), failed = failed.len(), "Bulk route creation finished");
        BulkRouteReport {
            total_created: created.len(),
            total_failed: failed.len(),
            created,
            failed,
        }
    }

    /// Attaches an existing catalog condition.
    pub async fn attach_condition(&self, route_id: RouteId, condition_id: ConditionId) -> Result<Route, ServiceError> {
        self.load(route_id).await?;
        if self.conditions.find_by_id(condition_id).await?.is_none() {
            return Err(ServiceError::not_found("Condition", condition_id));
        }

        let attached = self
            .routes
            .attach_condition(route_id, condition_id, self.clock.now())
            .await
            .map_err(|e| match e {
                RepositoryError::ForeignKey(ref constraint) if constraint == ROUTE_CONDITION_FK => {
                    ServiceError::not_found("Condition", condition_id)
                }
                other => route_error(other, route_id),
            })?;
        let route = self.load(route_id).await?;
        if !attached {
            debug!(route_id = %route_id, condition_id = %condition_id, "Condition already attached");
            return Ok(route);
        }

        info!(route_id = %route_id, condition_id = %condition_id, "Condition attached");
        count_mutation("attach_condition");
        self.event_bus.publish_route_event(RouteEvent::ConditionAttached {
            route_id,
            condition_id,
            attached_at: route.updated_at,
        });
        Ok(route)
    }

    /// Validates a new condition, stores it and attaches it in one write.
    pub async fn add_condition(&self, route_id: RouteId, spec: ConditionSpec) -> Result<Route, ServiceError> {
        self.load(route_id).await?;
        let now = self.clock.now();
        let condition = Condition::new(spec, now)?;

        self.routes
            .add_condition(route_id, &condition, now)
            .await
            .map_err(|e| route_error(e, route_id))?;
        let route = self.load(route_id).await?;

        info!(
            route_id = %route_id,
            condition_id = %condition.id,
            condition_type = condition.rule.type_name(),
            "Condition added to route"
        );
        count_mutation("add_condition");
        self.event_bus.publish_route_event(RouteEvent::ConditionDefined {
            condition_id: condition.id,
            name: condition.name,
            condition_type: condition.rule.type_name().to_string(),
            defined_at: now,
        });
        self.event_bus.publish_route_event(RouteEvent::ConditionAttached {
            route_id,
            condition_id: condition.id,
            attached_at: now,
        });
        Ok(route)
    }

    pub async fn detach_condition(&self, route_id: RouteId, condition_id: ConditionId) -> Result<Route, ServiceError> {
        let detached = self
            .routes
            .detach_condition(route_id, condition_id, self.clock.now())
            .await
            .map_err(|e| route_error(e, route_id))?;
        let route = self.load(route_id).await?;
        if !detached {
            debug!(route_id = %route_id, condition_id = %condition_id, "Condition not attached, nothing to detach");
            return Ok(route);
        }

        info!(route_id = %route_id, condition_id = %condition_id, "Condition detached");
        count_mutation("detach_condition");
        self.event_bus.publish_route_event(RouteEvent::ConditionDetached {
            route_id,
            condition_id,
            detached_at: route.updated_at,
        });
        Ok(route)
    }

    async fn load(&self, id: RouteId) -> Result<Route, ServiceError> {
        self.routes
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Route", id))
    }

    async fn check_references(&self, draft: &RouteDraft) -> Result<(), ServiceError> {
        if self.agents.find_by_id(draft.agent_id).await?.is_none() {
            warn!(agent_id = %draft.agent_id, "Route refers to unknown agent");
            return Err(ServiceError::AgentNotFound(draft.agent_id));
        }
        if self.features.find_by_id(draft.feature_id).await?.is_none() {
            warn!(feature_id = %draft.feature_id, "Route refers to unknown feature");
            return Err(ServiceError::FeatureNotFound(draft.feature_id));
        }
        Ok(())
    }
}

fn route_error(err: RepositoryError, id: RouteId) -> ServiceError {
    match err {
        RepositoryError::NotFound(_) => ServiceError::not_found("Route", id),
        other => other.into(),
    }
}

/// Foreign key failures on the route row name the reference that vanished
fn reference_error(err: RepositoryError, route: &Route) -> ServiceError {
    match err {
        RepositoryError::ForeignKey(ref constraint) if constraint == ROUTE_AGENT_FK => {
            ServiceError::AgentNotFound(route.agent_id)
        }
        RepositoryError::ForeignKey(ref constraint) if constraint == ROUTE_FEATURE_FK => {
            ServiceError::FeatureNotFound(route.feature_id)
        }
        other => other.into(),
    }
}
