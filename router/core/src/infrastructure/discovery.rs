// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Static Discovery Sources
//!
//! Deterministic implementations of [`DiscoverySource`], [`HealthProbe`] and
//! [`IamRoleSource`] returning a fixed catalogue. They back the default
//! server wiring and the test suites; real registry, IAM and health clients
//! plug in through the same traits.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashSet;

use crate::domain::agent::{Agent, AgentDefinition, AgentHealth, AgentSourceType};
use crate::domain::discovery::{DiscoveryError, DiscoverySource, HealthProbe, IamRoleSource};
use crate::domain::feature::{FeatureDefinition, StoreType};
use crate::domain::role::{RoleDefinition, RoleSource};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn agent(name: &str, description: &str, source_type: AgentSourceType, endpoint: &str, key: &str, config: Value) -> AgentDefinition {
    AgentDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        source_type,
        endpoint: endpoint.to_string(),
        api_key: Some(key.to_string()),
        config_data: object(config),
    }
}

fn feature(name: &str, description: &str, store_type: StoreType, url: &str, token: &str, config: Value) -> FeatureDefinition {
    FeatureDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        store_type,
        url: url.to_string(),
        token: Some(token.to_string()),
        config_data: object(config),
    }
}

fn role(name: &str, description: &str, permissions: &[&str], config: Value) -> RoleDefinition {
    RoleDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        config_data: object(config),
    }
}

/// Fixed agent and feature catalogue keyed by source/store type
#[derive(Debug, Clone, Default)]
pub struct StaticDiscoverySource;

impl StaticDiscoverySource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DiscoverySource for StaticDiscoverySource {
    async fn discover_agents(&self, source_type: AgentSourceType) -> Result<Vec<AgentDefinition>, DiscoveryError> {
        let agents = match source_type {
            AgentSourceType::Mcp => vec![
                agent(
                    "MCP Agent 1",
                    "Mock MCP agent",
                    source_type,
                    "https://mcp-server-1.example.com",
                    "mock-api-key",
                    json!({ "capabilities": ["text-generation", "file-access"] }),
                ),
                agent(
                    "MCP Agent 2",
                    "Another mock MCP agent",
                    source_type,
                    "https://mcp-server-2.example.com",
                    "mock-api-key-2",
                    json!({ "capabilities": ["web-search", "image-generation"] }),
                ),
            ],
            AgentSourceType::A2a => vec![agent(
                "A2A Agent 1",
                "Mock A2A agent",
                source_type,
                "https://a2a-registry.example.com/agent1",
                "mock-a2a-key",
                json!({ "registry": "example-registry" }),
            )],
            AgentSourceType::Workflow => vec![agent(
                "Workflow Engine 1",
                "Mock workflow engine",
                source_type,
                "https://workflow-engine.example.com",
                "mock-workflow-key",
                json!({ "engine_type": "temporal" }),
            )],
        };
        Ok(agents)
    }

    async fn discover_features(&self, store_type: StoreType) -> Result<Vec<FeatureDefinition>, DiscoveryError> {
        let features = match store_type {
            StoreType::HttpJson => vec![
                feature(
                    "API Feature 1",
                    "Mock HTTP JSON feature",
                    store_type,
                    "https://api.example.com/features/1",
                    "mock-api-token",
                    json!({ "endpoint": "/api/v1/features", "method": "GET" }),
                ),
                feature(
                    "API Feature 2",
                    "Another mock HTTP JSON feature",
                    store_type,
                    "https://api.example.com/features/2",
                    "mock-api-token-2",
                    json!({ "endpoint": "/api/v1/features", "method": "POST" }),
                ),
            ],
            StoreType::Git => vec![feature(
                "Git Feature 1",
                "Mock Git repository feature",
                store_type,
                "https://github.com/example/feature-repo",
                "mock-git-token",
                json!({ "branch": "main", "path": "features/" }),
            )],
            StoreType::S3 => vec![feature(
                "S3 Feature 1",
                "Mock S3 bucket feature",
                store_type,
                "s3://example-bucket/features/",
                "mock-s3-token",
                json!({ "bucket": "example-bucket", "prefix": "features/" }),
            )],
            StoreType::Gcs => vec![feature(
                "GCS Feature 1",
                "Mock GCS bucket feature",
                store_type,
                "gs://example-bucket/features/",
                "mock-gcs-token",
                json!({ "bucket": "example-bucket", "prefix": "features/" }),
            )],
        };
        Ok(features)
    }
}

/// Reports an agent healthy when its endpoint is an http(s) URL that has not
/// been marked down.
#[derive(Debug, Clone, Default)]
pub struct StaticHealthProbe {
    down: HashSet<String>,
}

impl StaticHealthProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_down_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.down.insert(endpoint.into());
        self
    }
}

#[async_trait]
impl HealthProbe for StaticHealthProbe {
    async fn probe(&self, agent: &Agent) -> Result<AgentHealth, DiscoveryError> {
        let reachable = agent.endpoint.starts_with("https://") || agent.endpoint.starts_with("http://");
        if reachable && !self.down.contains(&agent.endpoint) {
            Ok(AgentHealth::Healthy)
        } else {
            Ok(AgentHealth::Unhealthy)
        }
    }
}

/// Fixed IAM role catalogue per cloud provider
#[derive(Debug, Clone, Default)]
pub struct StaticIamRoleSource;

impl StaticIamRoleSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IamRoleSource for StaticIamRoleSource {
    async fn list_roles(&self, provider: RoleSource) -> Result<Vec<RoleDefinition>, DiscoveryError> {
        let trust_policy = json!({ "Version": "2012-10-17", "Statement": [] });
        match provider {
            RoleSource::Aws => Ok(vec![
                role(
                    "AWS-AdministratorAccess",
                    "AWS Administrator Access role",
                    &["*"],
                    json!({
                        "provider": "AWS",
                        "arn": "arn:aws:iam::123456789012:role/AdministratorAccess",
                        "trust_policy": trust_policy,
                    }),
                ),
                role(
                    "AWS-ReadOnlyAccess",
                    "AWS Read Only Access role",
                    &["s3:Get*", "ec2:Describe*", "iam:Get*"],
                    json!({
                        "provider": "AWS",
                        "arn": "arn:aws:iam::123456789012:role/ReadOnlyAccess",
                        "trust_policy": trust_policy,
                    }),
                ),
            ]),
            RoleSource::Azure => Ok(vec![role(
                "Azure-Owner",
                "Azure Owner role",
                &["*"],
                json!({
                    "provider": "AZURE",
                    "role_definition_id": "8e3af657-a8ff-443c-a75c-2fe8c4bcb635",
                    "scope": "/subscriptions/12345678-1234-1234-1234-123456789012",
                }),
            )]),
            RoleSource::Gcp => Ok(vec![role(
                "GCP-Owner",
                "GCP Owner role",
                &["*"],
                json!({
                    "provider": "GCP",
                    "role_id": "roles/owner",
                    "project_id": "example-project-123",
                }),
            )]),
            RoleSource::Custom => Err(DiscoveryError::Unsupported("importing CUSTOM roles".to_string())),
        }
    }
}
