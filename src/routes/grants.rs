//! Sharing grants on a resource.
//!
//! Creating or revoking a grant requires `share` authority over the resource,
//! decided by the engine itself: the owner, a full-access grantee, or a
//! manager whose scope covers the resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::catalog::Action;
use crate::authz::engine::{PolicyEngine, SqlPolicyEngine, TargetRef};
use crate::errors::AppResult;
use crate::jwt::AuthUser;
use crate::models::grant::{GrantCreateRequest, ShareGrant};
use crate::routes::resources::{parse_resource_type, require_allowed};
use crate::store;

/// List grants on a resource
#[utoipa::path(
    get,
    path = "/resources/{resource_type}/{resource_id}/grants",
    tag = "Grants",
    params(
        ("resource_type" = String, Path, description = "Resource kind"),
        ("resource_id" = Uuid, Path, description = "Resource ID"),
    ),
    responses((status = 200, description = "Grants on the resource", body = Vec<ShareGrant>)),
    security(("bearerAuth" = []))
)]
pub async fn list_grants(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((resource_type, resource_id)): Path<(String, Uuid)>,
) -> AppResult<Json<Vec<ShareGrant>>> {
    let resource_type = parse_resource_type(&resource_type)?;

    let grants = store::grants::list_for_resource(&state.pool, resource_type, resource_id).await?;
    Ok(Json(grants))
}

/// Share a resource with a user
#[utoipa::path(
    post,
    path = "/resources/{resource_type}/{resource_id}/grants",
    tag = "Grants",
    params(
        ("resource_type" = String, Path, description = "Resource kind"),
        ("resource_id" = Uuid, Path, description = "Resource ID"),
    ),
    request_body = GrantCreateRequest,
    responses(
        (status = 201, description = "Grant created", body = ShareGrant),
        (status = 403, description = "Actor may not share this resource"),
        (status = 409, description = "Grant already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_grant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((resource_type, resource_id)): Path<(String, Uuid)>,
    Json(req): Json<GrantCreateRequest>,
) -> AppResult<(StatusCode, Json<ShareGrant>)> {
    let resource_type = parse_resource_type(&resource_type)?;

    let engine = SqlPolicyEngine::new(state.pool.clone());
    let decision = engine
        .decide(auth.user_id, Action::Share, TargetRef::Existing { resource_type, resource_id })
        .await?;
    require_allowed(decision, "not allowed to share this resource")?;

    let grant =
        store::grants::create(&state.pool, Some(auth.user_id), resource_type, resource_id, req)
            .await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

/// Revoke a grant
#[utoipa::path(
    delete,
    path = "/resources/{resource_type}/{resource_id}/grants/{user_id}",
    tag = "Grants",
    params(
        ("resource_type" = String, Path, description = "Resource kind"),
        ("resource_id" = Uuid, Path, description = "Resource ID"),
        ("user_id" = Uuid, Path, description = "Grantee user ID"),
    ),
    responses(
        (status = 204, description = "Grant revoked"),
        (status = 404, description = "Grant not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_grant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((resource_type, resource_id, user_id)): Path<(String, Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let resource_type = parse_resource_type(&resource_type)?;

    let engine = SqlPolicyEngine::new(state.pool.clone());
    let decision = engine
        .decide(auth.user_id, Action::Share, TargetRef::Existing { resource_type, resource_id })
        .await?;
    require_allowed(decision, "not allowed to manage grants on this resource")?;

    store::grants::revoke(&state.pool, Some(auth.user_id), resource_type, resource_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
