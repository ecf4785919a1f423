// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use agent_router_core::application::{AccessService, ErrorKind, NewUser, Repositories, RoleRegistry, RouteService};
use agent_router_core::domain::agent::{Agent, AgentDefinition, AgentSourceType};
use agent_router_core::domain::clock::{Clock, SystemClock};
use agent_router_core::domain::feature::{Feature, FeatureDefinition, StoreType};
use agent_router_core::domain::repository::{AgentRepository, FeatureRepository, Page};
use agent_router_core::domain::role::{RoleDefinition, RoleSource};
use agent_router_core::domain::route::{RouteDraft, RouteRules};
use agent_router_core::domain::user::UserId;
use agent_router_core::infrastructure::discovery::StaticIamRoleSource;
use agent_router_core::infrastructure::event_bus::EventBus;
use std::sync::Arc;
use std::time::Duration;

fn registry(repositories: &Repositories) -> RoleRegistry {
    RoleRegistry::new(
        repositories,
        Arc::new(StaticIamRoleSource::new()),
        Duration::from_secs(5),
        Arc::new(SystemClock),
        Arc::new(EventBus::new(64)),
    )
}

fn role(name: &str) -> RoleDefinition {
    RoleDefinition {
        name: name.to_string(),
        description: Some(format!("{name} role")),
        permissions: vec!["read".to_string()],
        config_data: Default::default(),
    }
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        name: "Dana Operator".to_string(),
        hashed_password: String::new(),
    }
}

#[tokio::test]
async fn test_role_names_are_unique() {
    let repositories = Repositories::in_memory();
    let roles = registry(&repositories);

    let manager = roles.create_role(role("Manager")).await.unwrap();
    assert_eq!(manager.source, RoleSource::Custom);

    let err = roles.create_role(role("Manager")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.to_string(), "Role with this name already exists");

    let analyst = roles.create_role(role("Analyst")).await.unwrap();
    let err = roles.update_role(analyst.id, role("Manager")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Renaming to its own name is not a conflict.
    let mut same = role("Analyst");
    same.permissions.push("write".to_string());
    let updated = roles.update_role(analyst.id, same).await.unwrap();
    assert_eq!(updated.permissions, vec!["read".to_string(), "write".to_string()]);
}

#[tokio::test]
async fn test_list_roles_sorted_by_name() {
    let repositories = Repositories::in_memory();
    let roles = registry(&repositories);
    for name in ["Support", "Admin", "Manager"] {
        roles.create_role(role(name)).await.unwrap();
    }

    let names: Vec<String> = roles.list_roles().await.unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Admin", "Manager", "Support"]);
}

#[tokio::test]
async fn test_import_reports_existing_names_as_failed() {
    let repositories = Repositories::in_memory();
    let roles = registry(&repositories);

    let first = roles.import_iam_roles(RoleSource::Aws).await.unwrap();
    assert_eq!(first.failed.len(), 0);
    assert!(!first.imported.is_empty());
    assert!(first.imported.iter().all(|r| r.source == RoleSource::Aws));

    let second = roles.import_iam_roles(RoleSource::Aws).await.unwrap();
    assert!(second.imported.is_empty());
    assert_eq!(second.failed.len(), first.imported.len());
    assert_eq!(roles.list_roles().await.unwrap().len(), first.imported.len());
}

#[tokio::test]
async fn test_import_custom_provider_is_rejected() {
    let repositories = Repositories::in_memory();
    let roles = registry(&repositories);

    let err = roles.import_iam_roles(RoleSource::Custom).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
}

#[tokio::test]
async fn test_user_email_is_unique() {
    let repositories = Repositories::in_memory();
    let roles = registry(&repositories);

    roles.create_user(new_user("dana@example.com")).await.unwrap();
    let err = roles.create_user(new_user("dana@example.com")).await.unwrap_err();
    assert_eq!(err.to_string(), "User with this email already exists");
}

#[tokio::test]
async fn test_assign_and_revoke_roles() {
    let repositories = Repositories::in_memory();
    let roles = registry(&repositories);
    let manager = roles.create_role(role("Manager")).await.unwrap();
    let support = roles.create_role(role("Support")).await.unwrap();
    let user = roles.create_user(new_user("dana@example.com")).await.unwrap();

    roles.assign_role(user.id, manager.id).await.unwrap();
    let again = roles.assign_role(user.id, manager.id).await.unwrap();
    assert_eq!(again.role_ids, vec![manager.id]);
    roles.assign_role(user.id, support.id).await.unwrap();

    let held = roles.resolve_principal_roles(user.id).await.unwrap();
    assert!(held.contains("Manager") && held.contains("Support"));

    roles.revoke_role(user.id, manager.id).await.unwrap();
    let held = roles.resolve_principal_roles(user.id).await.unwrap();
    assert!(!held.contains("Manager"));
    assert!(held.contains("Support"));

    // Revoking a role that is not held changes nothing.
    let unchanged = roles.revoke_role(user.id, manager.id).await.unwrap();
    assert_eq!(unchanged.role_ids, vec![support.id]);
}

#[tokio::test]
async fn test_deleting_role_drops_memberships() {
    let repositories = Repositories::in_memory();
    let roles = registry(&repositories);
    let manager = roles.create_role(role("Manager")).await.unwrap();
    let user = roles.create_user(new_user("dana@example.com")).await.unwrap();
    roles.assign_role(user.id, manager.id).await.unwrap();

    roles.delete_role(manager.id).await.unwrap();

    assert!(roles.resolve_principal_roles(user.id).await.unwrap().is_empty());
    assert_eq!(roles.get_role(manager.id).await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_assign_users_to_role_reports_per_user() {
    let repositories = Repositories::in_memory();
    let roles = registry(&repositories);
    let admin = roles.create_role(role("Admin")).await.unwrap();
    let dana = roles.create_user(new_user("dana@example.com")).await.unwrap();
    let lee = roles.create_user(new_user("lee@example.com")).await.unwrap();
    let ghost = UserId::new();

    let report = roles
        .assign_users_to_role(admin.id, vec![dana.id, ghost, lee.id])
        .await
        .unwrap();

    assert_eq!(report.assigned, vec![dana.id, lee.id]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].user_id, ghost);
    assert_eq!(roles.list_users(Page::default()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_user_evaluation_sees_revocation_immediately() {
    let repositories = Repositories::in_memory();
    let roles = registry(&repositories);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let bus = Arc::new(EventBus::new(64));
    let routes = RouteService::new(&repositories, clock.clone(), bus.clone());
    let access = AccessService::new(&repositories, clock.clone(), bus);

    let now = clock.now();
    let agent = Agent::new(
        AgentDefinition {
            name: "Finance Agent".to_string(),
            description: None,
            source_type: AgentSourceType::Workflow,
            endpoint: "https://workflows.example.com/finance".to_string(),
            api_key: None,
            config_data: Default::default(),
        },
        now,
    )
    .unwrap();
    let feature = Feature::new(
        FeatureDefinition {
            name: "Ledger".to_string(),
            description: None,
            store_type: StoreType::Gcs,
            url: "gs://ledger".to_string(),
            token: None,
            config_data: Default::default(),
        },
        now,
    )
    .unwrap();
    repositories.agents.save(&agent).await.unwrap();
    repositories.features.save(&feature).await.unwrap();
    let route = routes
        .create_route(RouteDraft {
            feature_id: feature.id,
            agent_id: agent.id,
            rules: RouteRules::allow_only(["Manager"]),
            conditional: false,
        })
        .await
        .unwrap();

    let manager = roles.create_role(role("Manager")).await.unwrap();
    let user = roles.create_user(new_user("dana@example.com")).await.unwrap();
    roles.assign_role(user.id, manager.id).await.unwrap();
    assert!(access.evaluate_for_user(route.id, user.id).await.unwrap().allowed);

    roles.revoke_role(user.id, manager.id).await.unwrap();
    assert!(!access.evaluate_for_user(route.id, user.id).await.unwrap().allowed);
}
