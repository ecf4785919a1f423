// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # External Source Interfaces
//!
//! Agent discovery, feature discovery, agent health probing and IAM role
//! import all talk to systems outside the router. They are modelled as
//! traits so the catalog and role services only see definitions; the
//! concrete sources live in `crate::infrastructure::discovery`.
//!
//! Implementations must not retry. Callers bound each call with the timeout
//! configured under `spec.discovery` and surface a timeout as an error.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::agent::{Agent, AgentDefinition, AgentHealth, AgentSourceType};
use crate::domain::feature::{FeatureDefinition, StoreType};
use crate::domain::role::{RoleDefinition, RoleSource};

#[async_trait]
pub trait DiscoverySource: Send + Sync {
    async fn discover_agents(&self, source_type: AgentSourceType) -> Result<Vec<AgentDefinition>, DiscoveryError>;

    async fn discover_features(&self, store_type: StoreType) -> Result<Vec<FeatureDefinition>, DiscoveryError>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, agent: &Agent) -> Result<AgentHealth, DiscoveryError>;
}

#[async_trait]
pub trait IamRoleSource: Send + Sync {
    async fn list_roles(&self, provider: RoleSource) -> Result<Vec<RoleDefinition>, DiscoveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },

    #[error("Source does not support {0}")]
    Unsupported(String),

    #[error("Source failure: {0}")]
    Source(String),
}
