//! Custom role administration.
//!
//! Every mutation here lands in the audit log; the store writes the entry in
//! the same transaction as the change.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::catalog::Permission;
use crate::authz::guard;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::custom_role::{
    CustomRole, CustomRoleDetail, PermissionOverride, RoleCreateRequest, RoleUpdateRequest,
    SetOverrideRequest,
};
use crate::store;

/// List all custom roles
#[utoipa::path(
    get,
    path = "/roles",
    tag = "Roles",
    responses((status = 200, description = "List of custom roles", body = Vec<CustomRole>)),
    security(("bearerAuth" = []))
)]
pub async fn list_roles(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<Vec<CustomRole>>> {
    let roles = store::roles::list(&state.pool).await?;
    Ok(Json(roles))
}

/// Create a custom role
#[utoipa::path(
    post,
    path = "/roles",
    tag = "Roles",
    request_body = RoleCreateRequest,
    responses(
        (status = 201, description = "Role created", body = CustomRole),
        (status = 409, description = "Role name already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<RoleCreateRequest>,
) -> AppResult<(StatusCode, Json<CustomRole>)> {
    guard::require(&state.pool, auth.user_id, Permission::CanChangeRoles).await?;

    let role = store::roles::create(&state.pool, Some(auth.user_id), req).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// Get a custom role with its overrides
#[utoipa::path(
    get,
    path = "/roles/{role_id}",
    tag = "Roles",
    params(("role_id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role details", body = CustomRoleDetail),
        (status = 404, description = "Role not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_role(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(role_id): Path<Uuid>,
) -> AppResult<Json<CustomRoleDetail>> {
    let detail = store::roles::find_detail(&state.pool, role_id)
        .await?
        .ok_or_else(|| AppError::not_found("custom role not found"))?;

    Ok(Json(detail))
}

/// Update a custom role (rename, describe, activate/deactivate)
#[utoipa::path(
    put,
    path = "/roles/{role_id}",
    tag = "Roles",
    params(("role_id" = Uuid, Path, description = "Role ID")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Role updated", body = CustomRole),
        (status = 404, description = "Role not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<Uuid>,
    Json(req): Json<RoleUpdateRequest>,
) -> AppResult<Json<CustomRole>> {
    guard::require(&state.pool, auth.user_id, Permission::CanChangeRoles).await?;

    let role = store::roles::update(&state.pool, Some(auth.user_id), role_id, req).await?;
    Ok(Json(role))
}

/// Delete a custom role
#[utoipa::path(
    delete,
    path = "/roles/{role_id}",
    tag = "Roles",
    params(("role_id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 404, description = "Role not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    guard::require(&state.pool, auth.user_id, Permission::CanChangeRoles).await?;

    store::roles::delete(&state.pool, Some(auth.user_id), role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a role's permission overrides
#[utoipa::path(
    get,
    path = "/roles/{role_id}/overrides",
    tag = "Roles",
    params(("role_id" = Uuid, Path, description = "Role ID")),
    responses((status = 200, description = "List of overrides", body = Vec<PermissionOverride>)),
    security(("bearerAuth" = []))
)]
pub async fn list_overrides(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(role_id): Path<Uuid>,
) -> AppResult<Json<Vec<PermissionOverride>>> {
    store::roles::find(&state.pool, role_id)
        .await?
        .ok_or_else(|| AppError::not_found("custom role not found"))?;

    let overrides = store::roles::list_overrides(&state.pool, role_id).await?;
    Ok(Json(overrides))
}

/// Set (or replace) one permission override
#[utoipa::path(
    put,
    path = "/roles/{role_id}/overrides",
    tag = "Roles",
    params(("role_id" = Uuid, Path, description = "Role ID")),
    request_body = SetOverrideRequest,
    responses(
        (status = 200, description = "Override set", body = PermissionOverride),
        (status = 404, description = "Role not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn set_override(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<Uuid>,
    Json(req): Json<SetOverrideRequest>,
) -> AppResult<Json<PermissionOverride>> {
    guard::require(&state.pool, auth.user_id, Permission::CanChangeRoles).await?;

    let entry = store::roles::set_override(
        &state.pool,
        Some(auth.user_id),
        role_id,
        req.permission,
        req.allowed,
    )
    .await?;
    Ok(Json(entry))
}

/// Remove one permission override, reverting to the base role's default
#[utoipa::path(
    delete,
    path = "/roles/{role_id}/overrides/{permission}",
    tag = "Roles",
    params(
        ("role_id" = Uuid, Path, description = "Role ID"),
        ("permission" = String, Path, description = "Permission identifier"),
    ),
    responses(
        (status = 204, description = "Override removed"),
        (status = 404, description = "Override not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn remove_override(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((role_id, permission)): Path<(Uuid, String)>,
) -> AppResult<StatusCode> {
    guard::require(&state.pool, auth.user_id, Permission::CanChangeRoles).await?;

    let permission = Permission::parse(&permission)
        .ok_or_else(|| AppError::bad_request(format!("unknown permission: {}", permission)))?;

    store::roles::remove_override(&state.pool, Some(auth.user_id), role_id, permission).await?;
    Ok(StatusCode::NO_CONTENT)
}
