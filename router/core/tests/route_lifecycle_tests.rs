// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use agent_router_core::application::{
    AgentCatalogService, ConditionCatalog, ErrorKind, FeatureCatalogService, Repositories, RouteService, ServiceError,
};
use agent_router_core::domain::agent::{AgentDefinition, AgentId, AgentSourceType};
use agent_router_core::domain::clock::FixedClock;
use agent_router_core::domain::condition::{ConditionId, ConditionRule, ConditionSpec, ROLE_BASED, TIME_BASED};
use agent_router_core::domain::feature::{FeatureDefinition, FeatureId, StoreType};
use agent_router_core::domain::repository::{Page, RepositoryError, RouteRepository};
use agent_router_core::domain::route::{RouteDraft, RouteId, RouteRules, RouteStatus};
use agent_router_core::infrastructure::discovery::{StaticDiscoverySource, StaticHealthProbe};
use agent_router_core::infrastructure::event_bus::{DomainEvent, EventBus};
use agent_router_core::domain::events::RouteEvent;
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    routes: RouteService,
    conditions: ConditionCatalog,
    agents: AgentCatalogService,
    features: FeatureCatalogService,
    repositories: Repositories,
    bus: Arc<EventBus>,
}

fn fixture() -> Fixture {
    let repositories = Repositories::in_memory();
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap()));
    let bus = Arc::new(EventBus::new(64));
    let discovery = Arc::new(StaticDiscoverySource::new());
    Fixture {
        routes: RouteService::new(&repositories, clock.clone(), bus.clone()),
        conditions: ConditionCatalog::new(&repositories, clock.clone(), bus.clone()),
        agents: AgentCatalogService::new(
            &repositories,
            discovery.clone(),
            Arc::new(StaticHealthProbe::new()),
            Duration::from_secs(5),
            clock.clone(),
            bus.clone(),
        ),
        features: FeatureCatalogService::new(&repositories, discovery, Duration::from_secs(5), clock, bus.clone()),
        repositories,
        bus,
    }
}

fn night_shift() -> ConditionSpec {
    ConditionSpec {
        name: "Night Shift".to_string(),
        description: None,
        condition_type: TIME_BASED.to_string(),
        condition_data: json!({
            "start_time": "22:00",
            "end_time": "06:00",
            "timezone": "Europe/Berlin",
            "days_of_week": ["monday", "tuesday"]
        }),
    }
}

impl Fixture {
    async fn draft(&self) -> RouteDraft {
        let agent = self
            .agents
            .create_agent(AgentDefinition {
                name: "Support Bot".to_string(),
                description: None,
                source_type: AgentSourceType::A2a,
                endpoint: "https://a2a.example.com/support".to_string(),
                api_key: None,
                config_data: Default::default(),
            })
            .await
            .unwrap();
        let feature = self
            .features
            .create_feature(FeatureDefinition {
                name: "Ticket Store".to_string(),
                description: None,
                store_type: StoreType::S3,
                url: "s3://tickets".to_string(),
                token: None,
                config_data: Default::default(),
            })
            .await
            .unwrap();
        RouteDraft {
            feature_id: feature.id,
            agent_id: agent.id,
            rules: RouteRules::allow_only(["Support", "Support", "Manager"]),
            conditional: false,
        }
    }
}

#[tokio::test]
async fn test_create_route_normalizes_rules() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();

    assert_eq!(route.rules.allowed, vec!["Support".to_string(), "Manager".to_string()]);
    assert_eq!(route.status, RouteStatus::Active);
    assert_eq!(f.routes.get_route(route.id).await.unwrap(), route);
}

#[tokio::test]
async fn test_create_route_rejects_blank_role() {
    let f = fixture();
    let mut draft = f.draft().await;
    draft.rules.disallowed.push("  ".to_string());

    let err = f.routes.create_route(draft).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(f.routes.list_routes(Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_agent_reported_before_missing_feature() {
    let f = fixture();
    let mut draft = f.draft().await;
    draft.agent_id = AgentId::new();
    draft.feature_id = FeatureId::new();

    let err = f.routes.create_route(draft).await.unwrap_err();
    assert!(matches!(err, ServiceError::AgentNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrity);
}

#[tokio::test]
async fn test_create_route_with_missing_feature() {
    let f = fixture();
    let mut draft = f.draft().await;
    draft.feature_id = FeatureId::new();

    let err = f.routes.create_route(draft).await.unwrap_err();
    assert_eq!(err.to_string(), "Feature not found");
    assert!(f.routes.list_routes(Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_unknown_route_is_not_found() {
    let f = fixture();
    let mut draft = f.draft().await;
    draft.agent_id = AgentId::new();

    let err = f.routes.update_route(RouteId::new(), draft).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_update_with_missing_agent_leaves_route_untouched() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();

    let mut draft = f.draft().await;
    draft.agent_id = AgentId::new();
    draft.rules = RouteRules::allow_all();
    let err = f.routes.update_route(route.id, draft).await.unwrap_err();
    assert!(matches!(err, ServiceError::AgentNotFound(_)));

    assert_eq!(f.routes.get_route(route.id).await.unwrap(), route);
}

#[tokio::test]
async fn test_update_keeps_conditions_and_status() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();
    f.routes.add_condition(route.id, night_shift()).await.unwrap();
    f.routes.set_route_status(route.id, RouteStatus::Inactive).await.unwrap();

    let mut draft = f.draft().await;
    draft.conditional = true;
    let updated = f.routes.update_route(route.id, draft.clone()).await.unwrap();

    assert!(updated.conditional);
    assert_eq!(updated.agent_id, draft.agent_id);
    assert_eq!(updated.status, RouteStatus::Inactive);
    assert_eq!(updated.conditions.len(), 1);
}

#[tokio::test]
async fn test_delete_route() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();

    f.routes.delete_route(route.id).await.unwrap();

    assert_eq!(f.routes.get_route(route.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(f.routes.delete_route(route.id).await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_route_writes_do_not_revert_condition_edits() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();
    let gate = f
        .conditions
        .create_condition(ConditionSpec {
            name: "Admins".to_string(),
            description: None,
            condition_type: ROLE_BASED.to_string(),
            condition_data: json!({ "allowed_roles": ["Admin"] }),
        })
        .await
        .unwrap();
    f.routes.attach_condition(route.id, gate.id).await.unwrap();
    let snapshot = f.repositories.routes.find_by_id(route.id).await.unwrap().unwrap();

    let ops = ConditionSpec {
        name: "Admins".to_string(),
        description: None,
        condition_type: ROLE_BASED.to_string(),
        condition_data: json!({ "allowed_roles": ["Ops"] }),
    };
    f.conditions.update_condition(gate.id, ops).await.unwrap();

    f.repositories.routes.update(&snapshot).await.unwrap();
    f.routes.update_route(route.id, f.draft().await).await.unwrap();
    f.routes.set_route_status(route.id, RouteStatus::Inactive).await.unwrap();
    f.routes.attach_condition(route.id, gate.id).await.unwrap();

    let stored = f.conditions.get_condition(gate.id).await.unwrap();
    assert!(matches!(stored.rule, ConditionRule::RoleBased(ref g) if g.allowed_roles == vec!["Ops".to_string()]));
    let route = f.routes.get_route(route.id).await.unwrap();
    assert_eq!(route.conditions, vec![stored]);
}

#[tokio::test]
async fn test_deleted_route_is_not_written_back() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();
    let condition = f.conditions.create_condition(night_shift()).await.unwrap();
    f.routes.attach_condition(route.id, condition.id).await.unwrap();
    let snapshot = f.repositories.routes.find_by_id(route.id).await.unwrap().unwrap();

    f.routes.delete_route(route.id).await.unwrap();

    let err = f.repositories.routes.update(&snapshot).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
    let draft = f.draft().await;
    assert_eq!(f.routes.update_route(route.id, draft).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(
        f.routes.set_route_status(route.id, RouteStatus::Inactive).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        f.routes.attach_condition(route.id, condition.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        f.routes.detach_condition(route.id, condition.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        f.routes.add_condition(route.id, night_shift()).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    assert_eq!(f.routes.get_route(route.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert!(f.routes.list_routes(Page::default()).await.unwrap().is_empty());
    // the condition is free again
    f.conditions.delete_condition(condition.id).await.unwrap();
}

#[tokio::test]
async fn test_attach_condition_to_unknown_route() {
    let f = fixture();
    let condition = f.conditions.create_condition(night_shift()).await.unwrap();

    let err = f.routes.attach_condition(RouteId::new(), condition.id).await.unwrap_err();
    assert_eq!(err.to_string(), "Route not found");
    let err = f.routes.detach_condition(RouteId::new(), condition.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_attach_unknown_condition_names_the_condition() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();
    let missing = ConditionId::new();

    let err = f.routes.attach_condition(route.id, missing).await.unwrap_err();
    match err {
        ServiceError::NotFound { entity, id } => {
            assert_eq!(entity, "Condition");
            assert_eq!(id, missing.to_string());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(f.routes.get_route(route.id).await.unwrap().conditions.is_empty());
}

#[tokio::test]
async fn test_conditions_keep_attachment_order() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();
    let first = f.conditions.create_condition(night_shift()).await.unwrap();
    let mut later = night_shift();
    later.name = "Late Shift".to_string();
    let second = f.conditions.create_condition(later).await.unwrap();

    f.routes.attach_condition(route.id, second.id).await.unwrap();
    f.routes.attach_condition(route.id, first.id).await.unwrap();

    let stored = f.routes.get_route(route.id).await.unwrap();
    assert_eq!(stored.condition_ids(), vec![second.id, first.id]);
}

#[tokio::test]
async fn test_add_condition_validates_before_writing() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();
    let mut broken = night_shift();
    broken.condition_data["timezone"] = json!("Mars/Olympus");

    let err = f.routes.add_condition(route.id, broken).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(f.conditions.list_conditions().await.unwrap().is_empty());
    assert!(f.routes.get_route(route.id).await.unwrap().conditions.is_empty());
}

#[tokio::test]
async fn test_attached_condition_cannot_be_deleted() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();
    let route = f.routes.add_condition(route.id, night_shift()).await.unwrap();
    let condition_id = route.conditions[0].id;

    let err = f.conditions.delete_condition(condition_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    f.routes.detach_condition(route.id, condition_id).await.unwrap();
    f.conditions.delete_condition(condition_id).await.unwrap();
}

#[tokio::test]
async fn test_referenced_agent_cannot_be_deleted() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();

    let err = f.agents.delete_agent(route.agent_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = f.features.delete_feature(route.feature_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    f.routes.delete_route(route.id).await.unwrap();
    f.agents.delete_agent(route.agent_id).await.unwrap();
    f.features.delete_feature(route.feature_id).await.unwrap();
}

#[tokio::test]
async fn test_set_status_is_noop_when_unchanged() {
    let f = fixture();
    let route = f.routes.create_route(f.draft().await).await.unwrap();
    let mut events = f.bus.subscribe();

    let same = f.routes.set_route_status(route.id, RouteStatus::Active).await.unwrap();
    assert_eq!(same, route);

    let inactive = f.routes.set_route_status(route.id, RouteStatus::Inactive).await.unwrap();
    assert_eq!(inactive.status, RouteStatus::Inactive);

    match events.try_recv().unwrap() {
        DomainEvent::Route(RouteEvent::RouteStatusChanged { status, .. }) => assert_eq!(status, RouteStatus::Inactive),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_bulk_create_reports_each_entry() {
    let f = fixture();
    let good = f.draft().await;
    let mut missing_agent = good.clone();
    missing_agent.agent_id = AgentId::new();
    let mut blank_role = good.clone();
    blank_role.rules.allowed.push(String::new());

    let report = f
        .routes
        .bulk_create_routes(vec![good.clone(), missing_agent, blank_role, good])
        .await;

    assert_eq!(report.total_created, 2);
    assert_eq!(report.total_failed, 2);
    assert_eq!(report.failed[0].index, 1);
    assert_eq!(report.failed[0].error, "Agent not found");
    assert_eq!(report.failed[1].index, 2);
    assert_eq!(f.routes.list_routes(Page::default()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_routes_pagination() {
    let f = fixture();
    let draft = f.draft().await;
    for _ in 0..5 {
        f.routes.create_route(draft.clone()).await.unwrap();
    }

    let all = f.routes.list_routes(Page::default()).await.unwrap();
    let window = f.routes.list_routes(Page::from_query(None, None, Some(2), Some(2))).await.unwrap();

    assert_eq!(all.len(), 5);
    assert_eq!(window, all[2..4].to_vec());
}
