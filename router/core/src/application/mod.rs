// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod access;
pub mod activity_recorder;
pub mod catalog;
pub mod condition_catalog;
pub mod errors;
pub mod repository_factory;
pub mod role_registry;
pub mod route_service;
pub mod seed;

pub use access::{AccessService, RouteTestReport};
pub use activity_recorder::ActivityRecorder;
pub use catalog::{AgentCatalogService, AgentHealthReport, FeatureCatalogService};
pub use condition_catalog::ConditionCatalog;
pub use errors::{ErrorKind, ServiceError};
pub use repository_factory::{create_repositories, Repositories};
pub use role_registry::{NewUser, RoleAssignmentReport, RoleImportReport, RoleRegistry};
pub use route_service::{BulkRouteReport, RouteService};
pub use seed::{seed_sample_data, SeedSummary};
