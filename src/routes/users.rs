//! User snapshots, role assignment, and computed effective permissions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::catalog::Permission;
use crate::authz::guard;
use crate::authz::roles::{EffectivePermissions, PermissionSource};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::custom_role::AssignRoleRequest;
use crate::models::user::{
    EffectivePermissionsResponse, PermissionStatus, User, UserCreateRequest,
};
use crate::store;

/// Register an identity snapshot
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 409, description = "User already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    guard::require(&state.pool, auth.user_id, Permission::CanManageUsers).await?;

    let user = store::users::create(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "Users",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let user = store::users::find(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(user))
}

/// Assign a custom role to a user
#[utoipa::path(
    post,
    path = "/users/{user_id}/role",
    tag = "Users",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role assigned", body = User),
        (status = 409, description = "User already has a custom role"),
        (status = 422, description = "Role is deactivated"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn assign_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AssignRoleRequest>,
) -> AppResult<Json<User>> {
    guard::require(&state.pool, auth.user_id, Permission::CanChangeRoles).await?;

    let user =
        store::users::assign_role(&state.pool, Some(auth.user_id), user_id, req.role_id).await?;
    Ok(Json(user))
}

/// Unassign the user's custom role
#[utoipa::path(
    delete,
    path = "/users/{user_id}/role",
    tag = "Users",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Role unassigned", body = User),
        (status = 404, description = "No custom role assigned"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn unassign_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    guard::require(&state.pool, auth.user_id, Permission::CanChangeRoles).await?;

    let user = store::users::unassign_role(&state.pool, Some(auth.user_id), user_id).await?;
    Ok(Json(user))
}

/// Get computed effective permissions for a user
#[utoipa::path(
    get,
    path = "/users/{user_id}/effective-permissions",
    tag = "Users",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Effective permissions", body = EffectivePermissionsResponse),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn effective_permissions(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<EffectivePermissionsResponse>> {
    let user = store::users::find(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    let custom_role = match user.custom_role_id {
        Some(role_id) => store::roles::find_detail(&state.pool, role_id).await?,
        None => None,
    };

    let effective = EffectivePermissions::resolve(user.org_role, custom_role.as_ref());

    let permissions = effective
        .iter()
        .map(|(permission, allowed, source)| PermissionStatus {
            permission,
            category: permission.category(),
            allowed,
            source: match source {
                PermissionSource::Default => "default",
                PermissionSource::Override => "override",
            },
        })
        .collect();

    Ok(Json(EffectivePermissionsResponse {
        user_id: user.id,
        org_role: user.org_role,
        custom_role: custom_role
            .filter(|detail| detail.role.is_active)
            .map(|detail| detail.role.name),
        permissions,
    }))
}
