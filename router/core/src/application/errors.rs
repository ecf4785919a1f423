// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Service Errors
//!
//! Every application service returns [`ServiceError`]. [`ServiceError::kind`]
//! collapses the variants into the caller-facing taxonomy used by the HTTP
//! layer and the CLI.

use serde::Serialize;
use thiserror::Error;

use crate::domain::agent::AgentId;
use crate::domain::discovery::DiscoveryError;
use crate::domain::feature::FeatureId;
use crate::domain::repository::RepositoryError;
use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    ReferentialIntegrity,
    Conflict,
    Upstream,
    Storage,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Request that could not be decoded (bad path id, malformed body)
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Agent not found")]
    AgentNotFound(AgentId),

    #[error("Feature not found")]
    FeatureNotFound(FeatureId),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::Validation(_) | ServiceError::InvalidRequest(_) => ErrorKind::Validation,
            ServiceError::AgentNotFound(_) | ServiceError::FeatureNotFound(_) => ErrorKind::ReferentialIntegrity,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::Discovery(_) => ErrorKind::Upstream,
            ServiceError::Repository(_) => ErrorKind::Storage,
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(constraint) => ServiceError::Conflict(format!("Already exists ({constraint})")),
            RepositoryError::ForeignKey(constraint) => {
                ServiceError::Conflict(format!("Still referenced ({constraint})"))
            }
            RepositoryError::NotFound(what) => ServiceError::NotFound {
                entity: "Record",
                id: what,
            },
            other => ServiceError::Repository(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referential_errors_keep_wire_messages() {
        assert_eq!(ServiceError::AgentNotFound(AgentId::new()).to_string(), "Agent not found");
        assert_eq!(ServiceError::FeatureNotFound(FeatureId::new()).to_string(), "Feature not found");
        assert_eq!(
            ServiceError::AgentNotFound(AgentId::new()).kind(),
            ErrorKind::ReferentialIntegrity
        );
    }

    #[test]
    fn test_repository_error_mapping() {
        let err: ServiceError = RepositoryError::Conflict("roles_name_key".into()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: ServiceError = RepositoryError::ForeignKey("routes_agent_id_fkey".into()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: ServiceError = RepositoryError::Database("connection reset".into()).into();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_not_found_message() {
        let err = ServiceError::not_found("Route", "abc");
        assert_eq!(err.to_string(), "Route not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
