//! Resource metadata registration and ownership transfer.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::catalog::{Action, Permission, ResourceType};
use crate::authz::engine::{Decision, PolicyEngine, SqlPolicyEngine, TargetRef};
use crate::authz::guard;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::resource::{Resource, ResourceRegisterRequest, TransferRequest};
use crate::store;

pub(crate) fn parse_resource_type(value: &str) -> Result<ResourceType, AppError> {
    ResourceType::parse(value)
        .ok_or_else(|| AppError::bad_request(format!("unknown resource type: {}", value)))
}

/// Deny decisions become errors on enforcement routes.
pub(crate) fn require_allowed(decision: Decision, message: &str) -> Result<(), AppError> {
    if decision.allow {
        Ok(())
    } else {
        Err(AppError::forbidden(message.to_string()))
    }
}

/// Register a resource metadata snapshot
#[utoipa::path(
    post,
    path = "/resources",
    tag = "Resources",
    request_body = ResourceRegisterRequest,
    responses(
        (status = 201, description = "Resource registered", body = Resource),
        (status = 409, description = "Resource already registered"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn register_resource(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ResourceRegisterRequest>,
) -> AppResult<(StatusCode, Json<Resource>)> {
    guard::require(&state.pool, auth.user_id, Permission::CanCreateResources).await?;

    let resource = store::resources::register(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

/// Get a resource's metadata snapshot
#[utoipa::path(
    get,
    path = "/resources/{resource_type}/{resource_id}",
    tag = "Resources",
    params(
        ("resource_type" = String, Path, description = "Resource kind"),
        ("resource_id" = Uuid, Path, description = "Resource ID"),
    ),
    responses(
        (status = 200, description = "Resource metadata", body = Resource),
        (status = 404, description = "Resource not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_resource(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((resource_type, resource_id)): Path<(String, Uuid)>,
) -> AppResult<Json<Resource>> {
    let resource_type = parse_resource_type(&resource_type)?;

    let resource = store::resources::find(&state.pool, resource_type, resource_id)
        .await?
        .ok_or_else(|| AppError::not_found("resource not found"))?;

    Ok(Json(resource))
}

/// Transfer a resource's ownership (one-way, one-time)
#[utoipa::path(
    post,
    path = "/resources/{resource_type}/{resource_id}/transfer",
    tag = "Resources",
    params(
        ("resource_type" = String, Path, description = "Resource kind"),
        ("resource_id" = Uuid, Path, description = "Resource ID"),
    ),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Ownership transferred", body = Resource),
        (status = 403, description = "Actor may not transfer this resource"),
        (status = 422, description = "Resource already transferred"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn transfer_resource(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((resource_type, resource_id)): Path<(String, Uuid)>,
    Json(req): Json<TransferRequest>,
) -> AppResult<Json<Resource>> {
    let resource_type = parse_resource_type(&resource_type)?;

    // The engine itself decides whether the actor may transfer; no
    // enforcement-mode bypass here, this is a domain rule.
    let engine = SqlPolicyEngine::new(state.pool.clone());
    let decision = engine
        .decide(auth.user_id, Action::Transfer, TargetRef::Existing { resource_type, resource_id })
        .await?;
    require_allowed(decision, "not allowed to transfer this resource")?;

    let resource = store::resources::transfer(
        &state.pool,
        Some(auth.user_id),
        resource_type,
        resource_id,
        req.to_user_id,
    )
    .await?;

    Ok(Json(resource))
}
