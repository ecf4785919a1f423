// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Activity Recorder
//!
//! Subscribes to the event bus and appends every domain event to the
//! activity log. Runs as a background task; storage failures are logged and
//! never stop the loop.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::activity::ActivityLogEntry;
use crate::domain::events::{AccessEvent, CatalogEvent, RoleEvent, RouteEvent};
use crate::domain::repository::ActivityLogRepository;
use crate::infrastructure::event_bus::{DomainEvent, EventBus, EventBusError};

pub struct ActivityRecorder {
    repository: Arc<dyn ActivityLogRepository>,
    event_bus: Arc<EventBus>,
}

impl ActivityRecorder {
    pub fn new(repository: Arc<dyn ActivityLogRepository>, event_bus: Arc<EventBus>) -> Self {
        Self { repository, event_bus }
    }

    /// Spawns the recording loop. The subscription is taken before this
    /// returns, so events published afterwards are never missed. The task
    /// ends once every `EventBus` handle has been dropped.
    pub fn start(self) -> JoinHandle<()> {
        info!("Starting activity recorder");
        let mut receiver = self.event_bus.subscribe();
        let repository = self.repository;

        tokio::spawn(async move {
            let mut recorded = 0u64;
            let mut failures = 0u64;

            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        let entry = activity_entry(&event);
                        match repository.append(&entry).await {
                            Ok(()) => recorded += 1,
                            Err(e) => {
                                failures += 1;
                                error!(action = %entry.action, error = %e, "Failed to record activity");
                            }
                        }
                        if recorded % 100 == 0 && recorded > 0 {
                            debug!(recorded, failures, "Activity recorder progress");
                        }
                    }
                    Err(EventBusError::Lagged(n)) => {
                        warn!("Activity recorder lagged by {} events, activity entries were lost", n);
                    }
                    Err(EventBusError::Closed) | Err(EventBusError::Empty) => break,
                }
            }

            info!(recorded, failures, "Activity recorder stopped");
        })
    }
}

/// Maps an event onto an activity row: the variant name becomes the action
/// and the event body becomes the details.
pub fn activity_entry(event: &DomainEvent) -> ActivityLogEntry {
    let (resource_type, resource_id, created_at) = describe(event);
    let (action, details) = match event_body(event) {
        Some(Value::Object(outer)) => match outer.into_iter().next() {
            Some((action, details)) => (action, details),
            None => ("Unknown".to_string(), Value::Null),
        },
        _ => ("Unknown".to_string(), Value::Null),
    };
    ActivityLogEntry::new(action, resource_type, resource_id, details, created_at)
}

fn event_body(event: &DomainEvent) -> Option<Value> {
    let value = match event {
        DomainEvent::Catalog(e) => serde_json::to_value(e),
        DomainEvent::Route(e) => serde_json::to_value(e),
        DomainEvent::Role(e) => serde_json::to_value(e),
        DomainEvent::Access(e) => serde_json::to_value(e),
    };
    value.ok()
}

fn describe(event: &DomainEvent) -> (&'static str, Option<Uuid>, chrono::DateTime<chrono::Utc>) {
    match event {
        DomainEvent::Catalog(e) => match e {
            CatalogEvent::AgentRegistered { agent_id, registered_at, .. } => ("agent", Some(agent_id.0), *registered_at),
            CatalogEvent::AgentUpdated { agent_id, updated_at } => ("agent", Some(agent_id.0), *updated_at),
            CatalogEvent::AgentRemoved { agent_id, removed_at } => ("agent", Some(agent_id.0), *removed_at),
            CatalogEvent::AgentHealthChecked { agent_id, checked_at, .. } => ("agent", Some(agent_id.0), *checked_at),
            CatalogEvent::AgentsDiscovered { discovered_at, .. } => ("agent", None, *discovered_at),
            CatalogEvent::FeatureRegistered { feature_id, registered_at, .. } => {
                ("feature", Some(feature_id.0), *registered_at)
            }
            CatalogEvent::FeatureUpdated { feature_id, updated_at } => ("feature", Some(feature_id.0), *updated_at),
            CatalogEvent::FeatureRemoved { feature_id, removed_at } => ("feature", Some(feature_id.0), *removed_at),
            CatalogEvent::FeaturesDiscovered { discovered_at, .. } => ("feature", None, *discovered_at),
        },
        DomainEvent::Route(e) => match e {
            RouteEvent::RouteCreated { route_id, created_at, .. } => ("route", Some(route_id.0), *created_at),
            RouteEvent::RouteUpdated { route_id, updated_at } => ("route", Some(route_id.0), *updated_at),
            RouteEvent::RouteDeleted { route_id, deleted_at } => ("route", Some(route_id.0), *deleted_at),
            RouteEvent::RouteStatusChanged { route_id, changed_at, .. } => ("route", Some(route_id.0), *changed_at),
            RouteEvent::ConditionAttached { route_id, attached_at, .. } => ("route", Some(route_id.0), *attached_at),
            RouteEvent::ConditionDetached { route_id, detached_at, .. } => ("route", Some(route_id.0), *detached_at),
            RouteEvent::ConditionDefined { condition_id, defined_at, .. } => {
                ("condition", Some(condition_id.0), *defined_at)
            }
            RouteEvent::ConditionRedefined { condition_id, redefined_at } => {
                ("condition", Some(condition_id.0), *redefined_at)
            }
            RouteEvent::ConditionRemoved { condition_id, removed_at } => ("condition", Some(condition_id.0), *removed_at),
        },
        DomainEvent::Role(e) => match e {
            RoleEvent::RoleCreated { role_id, created_at, .. } => ("role", Some(role_id.0), *created_at),
            RoleEvent::RoleUpdated { role_id, updated_at } => ("role", Some(role_id.0), *updated_at),
            RoleEvent::RoleDeleted { role_id, deleted_at } => ("role", Some(role_id.0), *deleted_at),
            RoleEvent::RolesImported { imported_at, .. } => ("role", None, *imported_at),
            RoleEvent::UserCreated { user_id, created_at, .. } => ("user", Some(user_id.0), *created_at),
            RoleEvent::RoleAssigned { user_id, assigned_at, .. } => ("user", Some(user_id.0), *assigned_at),
            RoleEvent::RoleRevoked { user_id, revoked_at, .. } => ("user", Some(user_id.0), *revoked_at),
        },
        DomainEvent::Access(AccessEvent::AccessEvaluated { route_id, evaluated_at, .. }) => {
            ("route", Some(route_id.0), *evaluated_at)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route::RouteId;
    use crate::infrastructure::repositories::InMemoryActivityLogRepository;
    use chrono::Utc;
    use std::time::Duration;

    #[test]
    fn test_activity_entry_mapping() {
        let route_id = RouteId::new();
        let entry = activity_entry(&DomainEvent::Route(RouteEvent::RouteDeleted {
            route_id,
            deleted_at: Utc::now(),
        }));
        assert_eq!(entry.action, "RouteDeleted");
        assert_eq!(entry.resource_type, "route");
        assert_eq!(entry.resource_id, Some(route_id.0));
        assert_eq!(entry.details["route_id"], route_id.0.to_string());
    }

    #[tokio::test]
    async fn test_recorder_persists_events() {
        let repository = Arc::new(InMemoryActivityLogRepository::new());
        let event_bus = Arc::new(EventBus::new(16));
        let handle = ActivityRecorder::new(repository.clone(), event_bus.clone()).start();

        event_bus.publish_access_event(AccessEvent::AccessEvaluated {
            route_id: RouteId::new(),
            roles: vec!["Admin".to_string()],
            allowed: true,
            reason: "explicit allow".to_string(),
            dry_run: false,
            evaluated_at: Utc::now(),
        });

        let mut entries = Vec::new();
        for _ in 0..50 {
            entries = repository.recent(10).await.unwrap();
            if !entries.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "AccessEvaluated");

        drop(event_bus);
        handle.await.unwrap();
    }
}
