// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Aggregate
//!
//! An agent is a routable AI service endpoint (an MCP server, an A2A peer or a
//! workflow engine). Routes reference agents by [`AgentId`]; many routes may
//! point at the same agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Protocol the agent is reached over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentSourceType {
    #[serde(rename = "MCP")]
    Mcp,
    #[serde(rename = "A2A")]
    A2a,
    #[serde(rename = "WORKFLOW")]
    Workflow,
}

impl AgentSourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentSourceType::Mcp => "MCP",
            AgentSourceType::A2a => "A2A",
            AgentSourceType::Workflow => "WORKFLOW",
        }
    }
}

impl fmt::Display for AgentSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentSourceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MCP" => Ok(AgentSourceType::Mcp),
            "A2A" => Ok(AgentSourceType::A2a),
            "WORKFLOW" => Ok(AgentSourceType::Workflow),
            other => Err(ValidationError::UnknownVariant {
                field: "source_type",
                value: other.to_string(),
            }),
        }
    }
}

/// Operational status shared by agents and features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogStatus {
    Active,
    Inactive,
    Error,
}

impl CatalogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogStatus::Active => "active",
            CatalogStatus::Inactive => "inactive",
            CatalogStatus::Error => "error",
        }
    }
}

impl FromStr for CatalogStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CatalogStatus::Active),
            "inactive" => Ok(CatalogStatus::Inactive),
            "error" => Ok(CatalogStatus::Error),
            other => Err(ValidationError::UnknownVariant {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentHealth {
    Healthy,
    Unhealthy,
}

impl AgentHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentHealth::Healthy => "healthy",
            AgentHealth::Unhealthy => "unhealthy",
        }
    }
}

impl FromStr for AgentHealth {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(AgentHealth::Healthy),
            "unhealthy" => Ok(AgentHealth::Unhealthy),
            other => Err(ValidationError::UnknownVariant {
                field: "health",
                value: other.to_string(),
            }),
        }
    }
}

/// Caller-supplied agent definition, used for both create and update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub source_type: AgentSourceType,
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub config_data: serde_json::Map<String, serde_json::Value>,
}

impl AgentDefinition {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.name.len() > 255 {
            return Err(ValidationError::TooLong { field: "name", max: 255 });
        }
        if self.endpoint.trim().is_empty() {
            return Err(ValidationError::EmptyField("endpoint"));
        }
        if self.endpoint.len() > 500 {
            return Err(ValidationError::TooLong { field: "endpoint", max: 500 });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub description: Option<String>,
    pub source_type: AgentSourceType,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub status: CatalogStatus,
    pub health: AgentHealth,
    pub config_data: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// New agents start inactive and unhealthy until a health check says otherwise.
    pub fn new(definition: AgentDefinition, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        definition.validate()?;
        Ok(Self {
            id: AgentId::new(),
            name: definition.name,
            description: definition.description,
            source_type: definition.source_type,
            endpoint: definition.endpoint,
            api_key: definition.api_key,
            status: CatalogStatus::Inactive,
            health: AgentHealth::Unhealthy,
            config_data: definition.config_data,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, definition: AgentDefinition, now: DateTime<Utc>) -> Result<(), ValidationError> {
        definition.validate()?;
        self.name = definition.name;
        self.description = definition.description;
        self.source_type = definition.source_type;
        self.endpoint = definition.endpoint;
        self.api_key = definition.api_key;
        self.config_data = definition.config_data;
        self.updated_at = now;
        Ok(())
    }

    pub fn record_health(&mut self, health: AgentHealth, now: DateTime<Utc>) {
        self.health = health;
        self.updated_at = now;
    }

    pub fn set_status(&mut self, status: CatalogStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}
