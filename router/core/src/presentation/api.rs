// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # HTTP API
//!
//! axum router exposing every service under `/api/v1`, plus `/health`.
//! Failures are rendered as `{"detail": ..., "kind": ...}` with the status
//! code chosen from [`ServiceError::kind`].

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::{
    AccessService, AgentCatalogService, ConditionCatalog, ErrorKind, FeatureCatalogService, NewUser, Repositories,
    RoleRegistry, RouteService, ServiceError,
};
use crate::domain::agent::{AgentDefinition, AgentId, AgentSourceType};
use crate::domain::clock::Clock;
use crate::domain::condition::{ConditionId, ConditionSpec};
use crate::domain::discovery::{DiscoveryError, DiscoverySource, HealthProbe, IamRoleSource};
use crate::domain::feature::{FeatureDefinition, FeatureId, StoreType};
use crate::domain::repository::{ActivityLogRepository, Page};
use crate::domain::role::{RoleDefinition, RoleId, RoleSet, RoleSource};
use crate::domain::route::{RouteDraft, RouteId, RouteStatus};
use crate::domain::router_config::DiscoveryConfig;
use crate::domain::user::UserId;
use crate::infrastructure::discovery::{StaticDiscoverySource, StaticHealthProbe, StaticIamRoleSource};
use crate::infrastructure::event_bus::EventBus;

/// External systems the catalog and role services call out to
#[derive(Clone)]
pub struct ExternalSources {
    pub discovery: Arc<dyn DiscoverySource>,
    pub health: Arc<dyn HealthProbe>,
    pub iam: Arc<dyn IamRoleSource>,
    pub agent_timeout: Duration,
    pub feature_timeout: Duration,
    pub iam_timeout: Duration,
}

impl ExternalSources {
    /// Static catalogue sources bounded by the configured timeouts
    pub fn static_sources(config: &DiscoveryConfig) -> Self {
        Self {
            discovery: Arc::new(StaticDiscoverySource::new()),
            health: Arc::new(StaticHealthProbe::new()),
            iam: Arc::new(StaticIamRoleSource::new()),
            agent_timeout: config.agent_timeout(),
            feature_timeout: config.feature_timeout(),
            iam_timeout: config.iam_timeout(),
        }
    }
}

pub struct AppState {
    pub routes: RouteService,
    pub conditions: ConditionCatalog,
    pub roles: RoleRegistry,
    pub agents: AgentCatalogService,
    pub features: FeatureCatalogService,
    pub access: AccessService,
    pub activity: Arc<dyn ActivityLogRepository>,
}

impl AppState {
    pub fn new(
        repositories: &Repositories,
        clock: Arc<dyn Clock>,
        event_bus: Arc<EventBus>,
        sources: ExternalSources,
    ) -> Self {
        Self {
            routes: RouteService::new(repositories, clock.clone(), event_bus.clone()),
            conditions: ConditionCatalog::new(repositories, clock.clone(), event_bus.clone()),
            roles: RoleRegistry::new(
                repositories,
                sources.iam,
                sources.iam_timeout,
                clock.clone(),
                event_bus.clone(),
            ),
            agents: AgentCatalogService::new(
                repositories,
                sources.discovery.clone(),
                sources.health,
                sources.agent_timeout,
                clock.clone(),
                event_bus.clone(),
            ),
            features: FeatureCatalogService::new(
                repositories,
                sources.discovery,
                sources.feature_timeout,
                clock.clone(),
                event_bus.clone(),
            ),
            access: AccessService::new(repositories, clock, event_bus),
            activity: repositories.activity.clone(),
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/agents", get(list_agents).post(create_agent))
        .route("/agents/discover", post(discover_agents))
        .route("/agents/{id}", get(get_agent).put(update_agent).delete(delete_agent))
        .route("/agents/{id}/health", post(check_agent_health))
        .route("/features", get(list_features).post(create_feature))
        .route("/features/discover", post(discover_features))
        .route("/features/{id}", get(get_feature).put(update_feature).delete(delete_feature))
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/import", post(import_roles))
        .route("/roles/{id}", get(get_role).put(update_role).delete(delete_role))
        .route("/roles/{id}/users", post(assign_users_to_role))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/roles", get(get_user_roles))
        .route("/users/{id}/roles/{role_id}", put(assign_role).delete(revoke_role))
        .route("/conditions", get(list_conditions).post(create_condition))
        .route(
            "/conditions/{id}",
            get(get_condition).put(update_condition).delete(delete_condition),
        )
        .route("/routes", get(list_routes).post(create_route))
        .route("/routes/bulk", post(bulk_create_routes))
        .route("/routes/test", post(test_route))
        .route("/routes/{id}", get(get_route).put(update_route).delete(delete_route))
        .route("/routes/{id}/status", put(set_route_status))
        .route("/routes/{id}/evaluate", post(evaluate_route))
        .route("/routes/{id}/conditions", post(add_condition))
        .route(
            "/routes/{id}/conditions/{condition_id}",
            put(attach_condition).delete(detach_condition),
        )
        .route("/activity", get(list_activity));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::ReferentialIntegrity => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Upstream => match &self.0 {
                ServiceError::Discovery(DiscoveryError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            },
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let detail = match kind {
            ErrorKind::Storage => {
                tracing::error!(error = %self.0, "Request failed on storage");
                "Internal server error".to_string()
            }
            _ => self.0.to_string(),
        };
        (status, Json(json!({ "detail": detail, "kind": kind }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn invalid_request(detail: String) -> ApiError {
    ApiError(ServiceError::InvalidRequest(detail))
}

/// [`Path`] whose rejection renders as an [`ApiError`]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(invalid_request(rejection.body_text())),
        }
    }
}

/// [`Query`] whose rejection renders as an [`ApiError`]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(invalid_request(rejection.body_text())),
        }
    }
}

/// [`Json`] body whose rejection renders as an [`ApiError`]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(invalid_request(rejection.body_text())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
    pub size: Option<usize>,
}

impl ListQuery {
    fn page(&self) -> Page {
        Page::from_query(self.skip, self.limit, self.page, self.size)
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}

// ---------- agents ----------

async fn list_agents(State(state): State<Arc<AppState>>, ApiQuery(q): ApiQuery<ListQuery>) -> ApiResult<impl IntoResponse> {
    let agents = state.agents.list_agents(q.page()).await?;
    Ok(Json(json!({ "total": agents.len(), "agents": agents })))
}

async fn create_agent(
    State(state): State<Arc<AppState>>,
    ApiJson(definition): ApiJson<AgentDefinition>,
) -> ApiResult<impl IntoResponse> {
    let agent = state.agents.create_agent(definition).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

async fn get_agent(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.agents.get_agent(AgentId(id)).await?))
}

async fn update_agent(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(definition): ApiJson<AgentDefinition>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.agents.update_agent(AgentId(id), definition).await?))
}

async fn delete_agent(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    state.agents.delete_agent(AgentId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DiscoverAgentsRequest {
    pub source_type: AgentSourceType,
}

async fn discover_agents(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<DiscoverAgentsRequest>,
) -> ApiResult<impl IntoResponse> {
    let agents = state.agents.discover_agents(request.source_type).await?;
    Ok(Json(json!({ "total": agents.len(), "agents": agents })))
}

async fn check_agent_health(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.agents.check_agent_health(AgentId(id)).await?))
}

// ---------- features ----------

async fn list_features(
    State(state): State<Arc<AppState>>,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let features = state.features.list_features(q.page()).await?;
    Ok(Json(json!({ "total": features.len(), "features": features })))
}

async fn create_feature(
    State(state): State<Arc<AppState>>,
    ApiJson(definition): ApiJson<FeatureDefinition>,
) -> ApiResult<impl IntoResponse> {
    let feature = state.features.create_feature(definition).await?;
    Ok((StatusCode::CREATED, Json(feature)))
}

async fn get_feature(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.features.get_feature(FeatureId(id)).await?))
}

async fn update_feature(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(definition): ApiJson<FeatureDefinition>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.features.update_feature(FeatureId(id), definition).await?))
}

async fn delete_feature(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    state.features.delete_feature(FeatureId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DiscoverFeaturesRequest {
    pub store_type: StoreType,
}

async fn discover_features(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<DiscoverFeaturesRequest>,
) -> ApiResult<impl IntoResponse> {
    let features = state.features.discover_features(request.store_type).await?;
    Ok(Json(json!({ "total": features.len(), "features": features })))
}

// ---------- roles & users ----------

async fn list_roles(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let roles = state.roles.list_roles().await?;
    Ok(Json(json!({ "total": roles.len(), "roles": roles })))
}

async fn create_role(
    State(state): State<Arc<AppState>>,
    ApiJson(definition): ApiJson<RoleDefinition>,
) -> ApiResult<impl IntoResponse> {
    let role = state.roles.create_role(definition).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

async fn get_role(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.roles.get_role(RoleId(id)).await?))
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(definition): ApiJson<RoleDefinition>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.roles.update_role(RoleId(id), definition).await?))
}

async fn delete_role(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    state.roles.delete_role(RoleId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ImportRolesRequest {
    pub provider: RoleSource,
}

async fn import_roles(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ImportRolesRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.roles.import_iam_roles(request.provider).await?))
}

#[derive(Debug, Deserialize)]
pub struct AssignUsersRequest {
    pub user_ids: Vec<Uuid>,
}

async fn assign_users_to_role(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AssignUsersRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_ids = request.user_ids.into_iter().map(UserId).collect();
    Ok(Json(state.roles.assign_users_to_role(RoleId(id), user_ids).await?))
}

async fn list_users(State(state): State<Arc<AppState>>, ApiQuery(q): ApiQuery<ListQuery>) -> ApiResult<impl IntoResponse> {
    let users = state.roles.list_users(q.page()).await?;
    Ok(Json(json!({ "total": users.len(), "users": users })))
}

async fn create_user(State(state): State<Arc<AppState>>, ApiJson(new_user): ApiJson<NewUser>) -> ApiResult<impl IntoResponse> {
    let user = state.roles.create_user(new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.roles.get_user(UserId(id)).await?))
}

async fn get_user_roles(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<impl IntoResponse> {
    let roles = state.roles.resolve_principal_roles(UserId(id)).await?;
    Ok(Json(json!({ "user_id": id, "roles": roles })))
}

async fn assign_role(
    State(state): State<Arc<AppState>>,
    ApiPath((id, role_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.roles.assign_role(UserId(id), RoleId(role_id)).await?))
}

async fn revoke_role(
    State(state): State<Arc<AppState>>,
    ApiPath((id, role_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.roles.revoke_role(UserId(id), RoleId(role_id)).await?))
}

// ---------- conditions ----------

async fn list_conditions(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let conditions = state.conditions.list_conditions().await?;
    Ok(Json(json!({ "total": conditions.len(), "conditions": conditions })))
}

async fn create_condition(
    State(state): State<Arc<AppState>>,
    ApiJson(spec): ApiJson<ConditionSpec>,
) -> ApiResult<impl IntoResponse> {
    let condition = state.conditions.create_condition(spec).await?;
    Ok((StatusCode::CREATED, Json(condition)))
}

async fn get_condition(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.conditions.get_condition(ConditionId(id)).await?))
}

async fn update_condition(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(spec): ApiJson<ConditionSpec>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.conditions.update_condition(ConditionId(id), spec).await?))
}

async fn delete_condition(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    state.conditions.delete_condition(ConditionId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------- routes ----------

async fn list_routes(State(state): State<Arc<AppState>>, ApiQuery(q): ApiQuery<ListQuery>) -> ApiResult<impl IntoResponse> {
    let routes = state.routes.list_routes(q.page()).await?;
    Ok(Json(json!({ "total": routes.len(), "routes": routes })))
}

async fn create_route(State(state): State<Arc<AppState>>, ApiJson(draft): ApiJson<RouteDraft>) -> ApiResult<impl IntoResponse> {
    let route = state.routes.create_route(draft).await?;
    Ok((StatusCode::CREATED, Json(route)))
}

async fn bulk_create_routes(
    State(state): State<Arc<AppState>>,
    ApiJson(drafts): ApiJson<Vec<RouteDraft>>,
) -> impl IntoResponse {
    Json(state.routes.bulk_create_routes(drafts).await)
}

async fn get_route(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.routes.get_route(RouteId(id)).await?))
}

async fn update_route(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(draft): ApiJson<RouteDraft>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.routes.update_route(RouteId(id), draft).await?))
}

async fn delete_route(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    state.routes.delete_route(RouteId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RouteStatusRequest {
    pub status: RouteStatus,
}

async fn set_route_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<RouteStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.routes.set_route_status(RouteId(id), request.status).await?))
}

async fn add_condition(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(spec): ApiJson<ConditionSpec>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.routes.add_condition(RouteId(id), spec).await?))
}

async fn attach_condition(
    State(state): State<Arc<AppState>>,
    ApiPath((id, condition_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .routes
            .attach_condition(RouteId(id), ConditionId(condition_id))
            .await?,
    ))
}

async fn detach_condition(
    State(state): State<Arc<AppState>>,
    ApiPath((id, condition_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .routes
            .detach_condition(RouteId(id), ConditionId(condition_id))
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct RouteTestRequest {
    pub route_id: Uuid,
    #[serde(default)]
    pub user_roles: Vec<String>,
    /// Evaluate at this instant instead of now
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

async fn test_route(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<RouteTestRequest>,
) -> ApiResult<impl IntoResponse> {
    let roles: RoleSet = request.user_roles.into_iter().collect();
    Ok(Json(
        state
            .access
            .test_route(RouteId(request.route_id), &roles, request.at)
            .await?,
    ))
}

/// Either an explicit role set or a user whose roles are resolved.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EvaluateRequest {
    User { user_id: Uuid },
    Roles { roles: Vec<String> },
}

async fn evaluate_route(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<EvaluateRequest>,
) -> ApiResult<impl IntoResponse> {
    let decision = match request {
        EvaluateRequest::User { user_id } => state.access.evaluate_for_user(RouteId(id), UserId(user_id)).await?,
        EvaluateRequest::Roles { roles } => {
            let roles: RoleSet = roles.into_iter().collect();
            state.access.evaluate(RouteId(id), &roles).await?
        }
    };
    Ok(Json(json!({
        "route_id": id,
        "allowed": decision.allowed,
        "reason": decision.reason.to_string(),
        "decision": decision,
    })))
}

// ---------- activity ----------

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default = "default_activity_limit")]
    pub limit: usize,
}

fn default_activity_limit() -> usize {
    100
}

async fn list_activity(
    State(state): State<Arc<AppState>>,
    ApiQuery(q): ApiQuery<ActivityQuery>,
) -> ApiResult<impl IntoResponse> {
    let entries = state.activity.recent(q.limit).await.map_err(ServiceError::from)?;
    Ok(Json(json!({ "total": entries.len(), "activities": entries })))
}
