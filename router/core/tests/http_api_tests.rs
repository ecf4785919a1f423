// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use agent_router_core::application::{seed_sample_data, Repositories};
use agent_router_core::domain::clock::{Clock, FixedClock};
use agent_router_core::domain::router_config::DiscoveryConfig;
use agent_router_core::infrastructure::event_bus::EventBus;
use agent_router_core::presentation::api::{app, AppState, ExternalSources};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn router() -> Router {
    router_with(Repositories::in_memory())
}

fn router_with(repositories: Repositories) -> Router {
    // Wednesday 10:00 UTC
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()));
    let state = AppState::new(
        &repositories,
        clock,
        Arc::new(EventBus::new(64)),
        ExternalSources::static_sources(&DiscoveryConfig::default()),
    );
    app(Arc::new(state))
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn agent_and_feature(router: &Router) -> (String, String) {
    let (status, agent) = send(
        router,
        "POST",
        "/api/v1/agents",
        Some(json!({
            "name": "Sales Assistant",
            "source_type": "MCP",
            "endpoint": "https://agents.example.com/sales"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, feature) = send(
        router,
        "POST",
        "/api/v1/features",
        Some(json!({
            "name": "CRM API",
            "store_type": "HTTP_JSON",
            "url": "https://crm.example.com/api"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        agent["id"].as_str().unwrap().to_string(),
        feature["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&router(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_route_crud_and_evaluation() {
    let router = router();
    let (agent_id, feature_id) = agent_and_feature(&router).await;

    let (status, route) = send(
        &router,
        "POST",
        "/api/v1/routes",
        Some(json!({
            "agent_id": agent_id,
            "feature_id": feature_id,
            "rules": { "allowAll": true, "allowed": [], "disallowed": ["Guest"] }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let route_id = route["id"].as_str().unwrap().to_string();

    let (status, list) = send(&router, "GET", "/api/v1/routes?page=1&size=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);

    let (status, decision) = send(
        &router,
        "POST",
        &format!("/api/v1/routes/{route_id}/evaluate"),
        Some(json!({ "roles": ["Guest", "Manager"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decision["allowed"], false);
    assert_eq!(decision["reason"], "explicit deny");

    let (status, _) = send(&router, "DELETE", &format!("/api/v1/routes/{route_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&router, "GET", &format!("/api/v1/routes/{route_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Route not found");
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_create_route_with_unknown_agent_is_bad_request() {
    let router = router();
    let (_, feature_id) = agent_and_feature(&router).await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/routes",
        Some(json!({
            "agent_id": uuid::Uuid::new_v4(),
            "feature_id": feature_id,
            "rules": { "allowAll": true }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Agent not found");
}

#[tokio::test]
async fn test_invalid_condition_is_unprocessable() {
    let (status, body) = send(
        &router(),
        "POST",
        "/api/v1/conditions",
        Some(json!({
            "name": "Broken",
            "condition_type": "time_based",
            "condition_data": {
                "start_time": "25:00",
                "end_time": "17:00",
                "days_of_week": ["monday"]
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_duplicate_role_is_conflict() {
    let router = router();
    let role = json!({ "name": "Manager", "permissions": ["read"] });

    let (status, _) = send(&router, "POST", "/api/v1/roles", Some(role.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&router, "POST", "/api/v1/roles", Some(role)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "Role with this name already exists");
}

#[tokio::test]
async fn test_route_test_on_seeded_conditional_route() {
    let repositories = Repositories::in_memory();
    let clock = FixedClock::new(Utc::now());
    seed_sample_data(&repositories, &clock).await.unwrap();
    let router = router_with(repositories);

    let (_, list) = send(&router, "GET", "/api/v1/routes", None).await;
    let conditional = list["routes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["conditional"] == true)
        .unwrap();
    let route_id = conditional["id"].as_str().unwrap();

    let (status, report) = send(
        &router,
        "POST",
        "/api/v1/routes/test",
        Some(json!({
            "route_id": route_id,
            "user_roles": ["Nobody"],
            "at": "2025-01-15T10:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["allowed"], false);
    assert_eq!(report["reason"], "not in allow-list");
    assert_eq!(report["evaluated_at"], "2025-01-15T10:00:00Z");
}

#[tokio::test]
async fn test_discover_agents() {
    let router = router();

    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/agents/discover",
        Some(json!({ "source_type": "MCP" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let (_, list) = send(&router, "GET", "/api/v1/agents", None).await;
    assert_eq!(list["total"], 2);
}

#[tokio::test]
async fn test_malformed_id_rejected() {
    let (status, body) = send(&router(), "GET", "/api/v1/routes/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");
    assert!(body["detail"].as_str().is_some_and(|d| !d.is_empty()));
}

#[tokio::test]
async fn test_malformed_body_rendered_as_json_error() {
    let router = router();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/roles")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["kind"], "validation");

    let (status, body) = send(&router, "POST", "/api/v1/roles", Some(json!({ "description": "no name" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");

    let (status, body) = send(&router, "GET", "/api/v1/routes?skip=lots", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");
}
