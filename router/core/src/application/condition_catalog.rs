// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Condition Catalog
//!
//! Named, typed predicates shared between routes. Redefining a condition
//! changes it for every route it is attached to; deleting one is refused
//! while any route still has it attached.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::errors::ServiceError;
use crate::application::repository_factory::Repositories;
use crate::domain::clock::Clock;
use crate::domain::condition::{Condition, ConditionId, ConditionSpec};
use crate::domain::events::RouteEvent;
use crate::domain::repository::{ConditionRepository, RepositoryError};
use crate::infrastructure::event_bus::EventBus;

pub struct ConditionCatalog {
    conditions: Arc<dyn ConditionRepository>,
    clock: Arc<dyn Clock>,
    event_bus: Arc<EventBus>,
}

impl ConditionCatalog {
    pub fn new(repositories: &Repositories, clock: Arc<dyn Clock>, event_bus: Arc<EventBus>) -> Self {
        Self {
            conditions: repositories.conditions.clone(),
            clock,
            event_bus,
        }
    }

    pub async fn create_condition(&self, spec: ConditionSpec) -> Result<Condition, ServiceError> {
        let condition = Condition::new(spec, self.clock.now())?;
        self.conditions.save(&condition).await?;

        info!(condition_id = %condition.id, name = %condition.name, "Condition created");
        self.event_bus.publish_route_event(RouteEvent::ConditionDefined {
            condition_id: condition.id,
            name: condition.name.clone(),
            condition_type: condition.rule.type_name().to_string(),
            defined_at: condition.created_at,
        });
        Ok(condition)
    }

    pub async fn update_condition(&self, id: ConditionId, spec: ConditionSpec) -> Result<Condition, ServiceError> {
        let mut condition = self.get_condition(id).await?;
        condition.apply(spec, self.clock.now())?;
        self.conditions.save(&condition).await?;

        info!(condition_id = %id, "Condition updated");
        self.event_bus.publish_route_event(RouteEvent::ConditionRedefined {
            condition_id: id,
            redefined_at: condition.updated_at,
        });
        Ok(condition)
    }

    pub async fn delete_condition(&self, id: ConditionId) -> Result<(), ServiceError> {
        match self.conditions.delete(id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound(_)) => return Err(ServiceError::not_found("Condition", id)),
            Err(RepositoryError::ForeignKey(_)) => {
                warn!(condition_id = %id, "Refusing to delete condition attached to a route");
                return Err(ServiceError::Conflict(
                    "Condition is attached to one or more routes".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        info!(condition_id = %id, "Condition deleted");
        self.event_bus.publish_route_event(RouteEvent::ConditionRemoved {
            condition_id: id,
            removed_at: self.clock.now(),
        });
        Ok(())
    }

    pub async fn get_condition(&self, id: ConditionId) -> Result<Condition, ServiceError> {
        self.conditions
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Condition", id))
    }

    pub async fn list_conditions(&self) -> Result<Vec<Condition>, ServiceError> {
        Ok(self.conditions.list_all().await?)
    }
}
