// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Feature Aggregate
//!
//! A feature is a capability or data source (an HTTP JSON endpoint, a Git
//! repository, an S3 or GCS bucket) that routes expose to agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::agent::CatalogStatus;
use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub Uuid);

impl FeatureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for FeatureId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreType {
    #[serde(rename = "HTTP_JSON")]
    HttpJson,
    #[serde(rename = "GIT")]
    Git,
    #[serde(rename = "S3")]
    S3,
    #[serde(rename = "GCS")]
    Gcs,
}

impl StoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreType::HttpJson => "HTTP_JSON",
            StoreType::Git => "GIT",
            StoreType::S3 => "S3",
            StoreType::Gcs => "GCS",
        }
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP_JSON" => Ok(StoreType::HttpJson),
            "GIT" => Ok(StoreType::Git),
            "S3" => Ok(StoreType::S3),
            "GCS" => Ok(StoreType::Gcs),
            other => Err(ValidationError::UnknownVariant {
                field: "store_type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub store_type: StoreType,
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub config_data: serde_json::Map<String, serde_json::Value>,
}

impl FeatureDefinition {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.name.len() > 255 {
            return Err(ValidationError::TooLong { field: "name", max: 255 });
        }
        if self.url.trim().is_empty() {
            return Err(ValidationError::EmptyField("url"));
        }
        if self.url.len() > 500 {
            return Err(ValidationError::TooLong { field: "url", max: 500 });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub name: String,
    pub description: Option<String>,
    pub store_type: StoreType,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub status: CatalogStatus,
    pub config_data: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feature {
    pub fn new(definition: FeatureDefinition, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        definition.validate()?;
        Ok(Self {
            id: FeatureId::new(),
            name: definition.name,
            description: definition.description,
            store_type: definition.store_type,
            url: definition.url,
            token: definition.token,
            status: CatalogStatus::Inactive,
            config_data: definition.config_data,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, definition: FeatureDefinition, now: DateTime<Utc>) -> Result<(), ValidationError> {
        definition.validate()?;
        self.name = definition.name;
        self.description = definition.description;
        self.store_type = definition.store_type;
        self.url = definition.url;
        self.token = definition.token;
        self.config_data = definition.config_data;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_status(&mut self, status: CatalogStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}
