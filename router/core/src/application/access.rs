// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Access Service
//!
//! Loads a route snapshot and runs the pure evaluator from
//! [`crate::domain::policy`] against a principal's roles. The instant comes
//! from the injected clock unless a dry run supplies one. Every decision is
//! counted and published as an [`AccessEvent`].

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::errors::ServiceError;
use crate::application::repository_factory::Repositories;
use crate::domain::clock::Clock;
use crate::domain::events::AccessEvent;
use crate::domain::policy::{explain_access, AccessDecision, Evaluation};
use crate::domain::repository::{RouteRepository, UserRepository};
use crate::domain::role::RoleSet;
use crate::domain::route::{Route, RouteId};
use crate::domain::user::UserId;
use crate::infrastructure::event_bus::EventBus;

/// Dry-run result returned by [`AccessService::test_route`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTestReport {
    pub route_id: RouteId,
    pub allowed: bool,
    pub reason: String,
    /// Wall time spent loading and evaluating, in milliseconds
    pub response_time: f64,
    pub evaluated_at: DateTime<Utc>,
    pub details: Evaluation,
}

pub struct AccessService {
    routes: Arc<dyn RouteRepository>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
    event_bus: Arc<EventBus>,
}

impl AccessService {
    pub fn new(repositories: &Repositories, clock: Arc<dyn Clock>, event_bus: Arc<EventBus>) -> Self {
        Self {
            routes: repositories.routes.clone(),
            users: repositories.users.clone(),
            clock,
            event_bus,
        }
    }

    /// Decides whether a principal holding `roles` may traverse the route now.
    pub async fn evaluate(&self, route_id: RouteId, roles: &RoleSet) -> Result<AccessDecision, ServiceError> {
        let route = self.load(route_id).await?;
        let at = self.clock.now();
        let evaluation = explain_access(&route, roles, at);
        self.record(&route, roles, &evaluation.decision, false, at);
        Ok(evaluation.decision)
    }

    /// Same as [`evaluate`](Self::evaluate) with roles resolved from the
    /// user's current memberships.
    pub async fn evaluate_for_user(&self, route_id: RouteId, user_id: UserId) -> Result<AccessDecision, ServiceError> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(ServiceError::not_found("User", user_id));
        }
        let roles: RoleSet = self.users.role_names(user_id).await?.into_iter().collect();
        self.evaluate(route_id, &roles).await
    }

    /// Dry run: evaluates at `at` (or now) and returns the per-condition
    /// details alongside the decision.
    pub async fn test_route(
        &self,
        route_id: RouteId,
        roles: &RoleSet,
        at: Option<DateTime<Utc>>,
    ) -> Result<RouteTestReport, ServiceError> {
        let started = Instant::now();
        let route = self.load(route_id).await?;
        let at = at.unwrap_or_else(|| self.clock.now());

        let details = explain_access(&route, roles, at);
        let response_time = started.elapsed().as_secs_f64() * 1000.0;
        self.record(&route, roles, &details.decision, true, at);

        Ok(RouteTestReport {
            route_id,
            allowed: details.decision.allowed,
            reason: details.decision.reason.to_string(),
            response_time,
            evaluated_at: at,
            details,
        })
    }

    async fn load(&self, id: RouteId) -> Result<Route, ServiceError> {
        self.routes
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Route", id))
    }

    fn record(&self, route: &Route, roles: &RoleSet, decision: &AccessDecision, dry_run: bool, at: DateTime<Utc>) {
        let outcome = if decision.allowed { "allow" } else { "deny" };
        metrics::counter!("router_access_decisions_total", "outcome" => outcome).increment(1);

        debug!(
            route_id = %route.id,
            allowed = decision.allowed,
            reason = %decision.reason,
            dry_run,
            "Access evaluated"
        );
        self.event_bus.publish_access_event(AccessEvent::AccessEvaluated {
            route_id: route.id,
            roles: roles.iter().map(str::to_string).collect(),
            allowed: decision.allowed,
            reason: decision.reason.to_string(),
            dry_run,
            evaluated_at: at,
        });
    }
}
