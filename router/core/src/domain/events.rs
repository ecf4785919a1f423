// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain events published by the catalog, route, role and access services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentHealth, AgentId, AgentSourceType};
use crate::domain::condition::ConditionId;
use crate::domain::feature::{FeatureId, StoreType};
use crate::domain::role::{RoleId, RoleSource};
use crate::domain::route::{RouteId, RouteStatus};
use crate::domain::user::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CatalogEvent {
    AgentRegistered {
        agent_id: AgentId,
        name: String,
        source_type: AgentSourceType,
        registered_at: DateTime<Utc>,
    },
    AgentUpdated {
        agent_id: AgentId,
        updated_at: DateTime<Utc>,
    },
    AgentRemoved {
        agent_id: AgentId,
        removed_at: DateTime<Utc>,
    },
    AgentHealthChecked {
        agent_id: AgentId,
        health: AgentHealth,
        checked_at: DateTime<Utc>,
    },
    AgentsDiscovered {
        source_type: AgentSourceType,
        count: usize,
        discovered_at: DateTime<Utc>,
    },
    FeatureRegistered {
        feature_id: FeatureId,
        name: String,
        store_type: StoreType,
        registered_at: DateTime<Utc>,
    },
    FeatureUpdated {
        feature_id: FeatureId,
        updated_at: DateTime<Utc>,
    },
    FeatureRemoved {
        feature_id: FeatureId,
        removed_at: DateTime<Utc>,
    },
    FeaturesDiscovered {
        store_type: StoreType,
        count: usize,
        discovered_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RouteEvent {
    RouteCreated {
        route_id: RouteId,
        feature_id: FeatureId,
        agent_id: AgentId,
        created_at: DateTime<Utc>,
    },
    RouteUpdated {
        route_id: RouteId,
        updated_at: DateTime<Utc>,
    },
    RouteDeleted {
        route_id: RouteId,
        deleted_at: DateTime<Utc>,
    },
    RouteStatusChanged {
        route_id: RouteId,
        status: RouteStatus,
        changed_at: DateTime<Utc>,
    },
    ConditionAttached {
        route_id: RouteId,
        condition_id: ConditionId,
        attached_at: DateTime<Utc>,
    },
    ConditionDetached {
        route_id: RouteId,
        condition_id: ConditionId,
        detached_at: DateTime<Utc>,
    },
    ConditionDefined {
        condition_id: ConditionId,
        name: String,
        condition_type: String,
        defined_at: DateTime<Utc>,
    },
    ConditionRedefined {
        condition_id: ConditionId,
        redefined_at: DateTime<Utc>,
    },
    ConditionRemoved {
        condition_id: ConditionId,
        removed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoleEvent {
    RoleCreated {
        role_id: RoleId,
        name: String,
        source: RoleSource,
        created_at: DateTime<Utc>,
    },
    RoleUpdated {
        role_id: RoleId,
        updated_at: DateTime<Utc>,
    },
    RoleDeleted {
        role_id: RoleId,
        deleted_at: DateTime<Utc>,
    },
    RolesImported {
        provider: RoleSource,
        imported: usize,
        failed: usize,
        imported_at: DateTime<Utc>,
    },
    UserCreated {
        user_id: UserId,
        email: String,
        created_at: DateTime<Utc>,
    },
    RoleAssigned {
        user_id: UserId,
        role_id: RoleId,
        assigned_at: DateTime<Utc>,
    },
    RoleRevoked {
        user_id: UserId,
        role_id: RoleId,
        revoked_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AccessEvent {
    AccessEvaluated {
        route_id: RouteId,
        roles: Vec<String>,
        allowed: bool,
        reason: String,
        dry_run: bool,
        evaluated_at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_event_serialization() {
        let route_id = RouteId::new();
        let event = RouteEvent::ConditionAttached {
            route_id,
            condition_id: ConditionId::new(),
            attached_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ConditionAttached"));
        let deserialized: RouteEvent = serde_json::from_str(&json).unwrap();
        if let RouteEvent::ConditionAttached { route_id: id, .. } = deserialized {
            assert_eq!(id, route_id);
        } else {
            panic!("unexpected variant");
        }
    }

    #[test]
    fn test_access_event_serialization() {
        let event = AccessEvent::AccessEvaluated {
            route_id: RouteId::new(),
            roles: vec!["Guest".to_string()],
            allowed: false,
            reason: "explicit deny".to_string(),
            dry_run: true,
            evaluated_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["AccessEvaluated"]["reason"], "explicit deny");
        assert_eq!(json["AccessEvaluated"]["dry_run"], true);
    }

    #[test]
    fn test_roles_imported_serialization() {
        let event = RoleEvent::RolesImported {
            provider: RoleSource::Aws,
            imported: 2,
            failed: 1,
            imported_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["RolesImported"]["provider"], "AWS");
    }
}
