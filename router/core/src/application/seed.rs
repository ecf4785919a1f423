// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Sample data for local development and demos.
//!
//! Seeding is skipped entirely when any agent already exists.

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::application::errors::ServiceError;
use crate::application::repository_factory::Repositories;
use crate::domain::agent::{Agent, AgentDefinition, AgentHealth, AgentSourceType, CatalogStatus};
use crate::domain::clock::Clock;
use crate::domain::condition::{Condition, ConditionSpec, ROLE_BASED, TIME_BASED};
use crate::domain::feature::{Feature, FeatureDefinition, StoreType};
use crate::domain::repository::Page;
use crate::domain::role::{Role, RoleDefinition, RoleSource};
use crate::domain::route::{Route, RouteDraft, RouteRules};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub skipped: bool,
    pub agents: usize,
    pub features: usize,
    pub roles: usize,
    pub routes: usize,
    pub conditions: usize,
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn sample_agents() -> Vec<(AgentDefinition, CatalogStatus, AgentHealth)> {
    let agent = |name: &str, description: &str, source_type, endpoint: &str, key: &str, config: Value| AgentDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        source_type,
        endpoint: endpoint.to_string(),
        api_key: Some(key.to_string()),
        config_data: object(config),
    };
    let up = (CatalogStatus::Active, AgentHealth::Healthy);

    vec![
        (
            agent(
                "Claude Agent",
                "Anthropic's Claude AI assistant for complex reasoning tasks",
                AgentSourceType::Mcp,
                "https://api.anthropic.com/v1/messages",
                "claude_api_key_123",
                json!({ "model": "claude-3-sonnet", "max_tokens": 4000 }),
            ),
            up.0,
            up.1,
        ),
        (
            agent(
                "GPT-4 Agent",
                "OpenAI's GPT-4 for general AI tasks and conversations",
                AgentSourceType::Mcp,
                "https://api.openai.com/v1/chat/completions",
                "gpt_api_key_456",
                json!({ "model": "gpt-4", "temperature": 0.7 }),
            ),
            up.0,
            up.1,
        ),
        (
            agent(
                "Code Assistant",
                "Specialized agent for code generation and review",
                AgentSourceType::A2a,
                "https://code-assistant.example.com/api",
                "code_api_key_789",
                json!({ "languages": ["python", "javascript", "typescript"] }),
            ),
            up.0,
            up.1,
        ),
        (
            agent(
                "Data Analyst",
                "Agent specialized in data analysis and visualization",
                AgentSourceType::Workflow,
                "https://data-analyst.example.com/api",
                "data_api_key_101",
                json!({ "tools": ["pandas", "matplotlib", "seaborn"] }),
            ),
            up.0,
            up.1,
        ),
        (
            agent(
                "Document Processor",
                "Agent for processing and analyzing documents",
                AgentSourceType::Mcp,
                "https://doc-processor.example.com/api",
                "doc_api_key_202",
                json!({ "supported_formats": ["pdf", "docx", "txt"] }),
            ),
            CatalogStatus::Inactive,
            AgentHealth::Unhealthy,
        ),
    ]
}

fn sample_features() -> Vec<(FeatureDefinition, CatalogStatus)> {
    let feature = |name: &str, description: &str, store_type, url: &str, token: &str, config: Value| FeatureDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        store_type,
        url: url.to_string(),
        token: Some(token.to_string()),
        config_data: object(config),
    };

    vec![
        (
            feature(
                "User Authentication",
                "Handle user login, registration, and session management",
                StoreType::HttpJson,
                "https://auth-service.example.com/features",
                "auth_token_123",
                json!({ "endpoints": ["/login", "/register", "/logout"] }),
            ),
            CatalogStatus::Active,
        ),
        (
            feature(
                "File Upload",
                "Upload and manage files with various formats",
                StoreType::S3,
                "s3://file-storage-bucket/features",
                "s3_token_456",
                json!({ "max_size": "10MB", "allowed_types": ["jpg", "png", "pdf"] }),
            ),
            CatalogStatus::Active,
        ),
        (
            feature(
                "Email Notifications",
                "Send email notifications to users",
                StoreType::HttpJson,
                "https://email-service.example.com/features",
                "email_token_789",
                json!({ "templates": ["welcome", "reset_password", "notification"] }),
            ),
            CatalogStatus::Active,
        ),
        (
            feature(
                "Data Export",
                "Export data in various formats (CSV, JSON, Excel)",
                StoreType::Git,
                "https://github.com/example/data-export-features",
                "git_token_101",
                json!({ "formats": ["csv", "json", "xlsx"], "batch_size": 1000 }),
            ),
            CatalogStatus::Active,
        ),
        (
            feature(
                "Real-time Chat",
                "Real-time messaging and chat functionality",
                StoreType::HttpJson,
                "https://chat-service.example.com/features",
                "chat_token_202",
                json!({ "websocket": true, "rooms": true }),
            ),
            CatalogStatus::Inactive,
        ),
        (
            feature(
                "Payment Processing",
                "Process payments with multiple payment gateways",
                StoreType::HttpJson,
                "https://payment-service.example.com/features",
                "payment_token_303",
                json!({ "gateways": ["stripe", "paypal", "square"] }),
            ),
            CatalogStatus::Active,
        ),
    ]
}

fn sample_roles() -> Vec<(RoleDefinition, RoleSource)> {
    let role = |name: &str, description: &str, permissions: &[&str]| RoleDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        config_data: Map::new(),
    };

    vec![
        (
            role(
                "Program Author",
                "Can create and manage programs and content",
                &["create_program", "edit_program", "delete_program"],
            ),
            RoleSource::Custom,
        ),
        (
            role(
                "Learner",
                "Can access and participate in learning programs",
                &["view_program", "submit_assignment", "view_progress"],
            ),
            RoleSource::Custom,
        ),
        (
            role(
                "Reviewer",
                "Can review and approve content and submissions",
                &["review_content", "approve_submission", "provide_feedback"],
            ),
            RoleSource::Custom,
        ),
        (role("Admin", "Full administrative access to the system", &["*"]), RoleSource::Custom),
        (
            role(
                "Manager",
                "Can manage teams and oversee operations",
                &["manage_team", "view_reports", "assign_tasks"],
            ),
            RoleSource::Custom,
        ),
        (role("Guest", "Limited access for guest users", &["view_public_content"]), RoleSource::Custom),
        (role("EC2FullAccess", "Full access to EC2 instances", &["ec2:*"]), RoleSource::Aws),
        (
            role(
                "S3ReadOnlyAccess",
                "Read-only access to S3 buckets",
                &["s3:GetObject", "s3:ListBucket"],
            ),
            RoleSource::Aws,
        ),
    ]
}

fn sample_conditions() -> Vec<ConditionSpec> {
    vec![
        ConditionSpec {
            name: "Business Hours".to_string(),
            description: Some("Only allow access during business hours (9 AM - 5 PM)".to_string()),
            condition_type: TIME_BASED.to_string(),
            condition_data: json!({
                "start_time": "09:00",
                "end_time": "17:00",
                "timezone": "UTC",
                "days_of_week": ["monday", "tuesday", "wednesday", "thursday", "friday"],
            }),
        },
        ConditionSpec {
            name: "High Priority Users".to_string(),
            description: Some("Allow access for high priority users regardless of time".to_string()),
            condition_type: ROLE_BASED.to_string(),
            condition_data: json!({
                "allowed_roles": ["Admin", "Manager"],
                "override_time_restrictions": true,
            }),
        },
    ]
}

/// Loads the sample catalogue. The conditional "Data Export" route gets both
/// sample conditions attached.
pub async fn seed_sample_data(repositories: &Repositories, clock: &dyn Clock) -> Result<SeedSummary, ServiceError> {
    if !repositories.agents.list(Page::new(0, 1)).await?.is_empty() {
        info!("Store already contains agents, skipping seed");
        return Ok(SeedSummary {
            skipped: true,
            ..SeedSummary::default()
        });
    }

    let now = clock.now();

    let mut agents = Vec::new();
    for (definition, status, health) in sample_agents() {
        let mut agent = Agent::new(definition, now)?;
        agent.set_status(status, now);
        agent.record_health(health, now);
        agents.push(agent);
    }
    repositories.agents.save_all(&agents).await?;

    let mut features = Vec::new();
    for (definition, status) in sample_features() {
        let mut feature = Feature::new(definition, now)?;
        feature.set_status(status, now);
        features.push(feature);
    }
    repositories.features.save_all(&features).await?;

    let roles = sample_roles()
        .into_iter()
        .map(|(definition, source)| Role::new(definition, source, now))
        .collect::<Result<Vec<_>, _>>()?;
    repositories.roles.save_all(&roles).await?;

    let conditions = sample_conditions()
        .into_iter()
        .map(|spec| Condition::new(spec, now))
        .collect::<Result<Vec<_>, _>>()?;
    for condition in &conditions {
        repositories.conditions.save(condition).await?;
    }

    let bindings = [
        (0, 0, RouteRules::allow_all(), false),
        (1, 2, RouteRules::allow_only(["Admin", "Manager"]).denying(["Guest"]), false),
        (2, 1, RouteRules::allow_all(), false),
        (3, 3, RouteRules::allow_only(["Admin", "Manager", "Reviewer"]).denying(["Guest"]), true),
    ];
    let mut routes = Vec::new();
    for (feature_index, agent_index, rules, conditional) in bindings {
        let mut route = Route::new(
            RouteDraft {
                feature_id: features[feature_index].id,
                agent_id: agents[agent_index].id,
                rules,
                conditional,
            },
            now,
        )?;
        if conditional {
            for condition in &conditions {
                route.attach(condition.clone(), now);
            }
        }
        repositories.routes.insert(&route).await?;
        routes.push(route);
    }

    let summary = SeedSummary {
        skipped: false,
        agents: agents.len(),
        features: features.len(),
        roles: roles.len(),
        routes: routes.len(),
        conditions: conditions.len(),
    };
    info!(
        agents = summary.agents,
        features = summary.features,
        roles = summary.roles,
        routes = summary.routes,
        conditions = summary.conditions,
        "Sample data seeded"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::SystemClock;

    #[tokio::test]
    async fn test_seed_is_applied_once() {
        let repositories = Repositories::in_memory();
        let first = seed_sample_data(&repositories, &SystemClock).await.unwrap();
        assert_eq!(
            first,
            SeedSummary {
                skipped: false,
                agents: 5,
                features: 6,
                roles: 8,
                routes: 4,
                conditions: 2,
            }
        );

        let second = seed_sample_data(&repositories, &SystemClock).await.unwrap();
        assert!(second.skipped);
        assert_eq!(repositories.roles.list_all().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_conditional_seed_route_has_conditions() {
        let repositories = Repositories::in_memory();
        seed_sample_data(&repositories, &SystemClock).await.unwrap();

        let routes = repositories.routes.list(Page::all()).await.unwrap();
        let conditional: Vec<_> = routes.iter().filter(|r| r.conditional).collect();
        assert_eq!(conditional.len(), 1);
        assert_eq!(conditional[0].conditions.len(), 2);
    }
}
