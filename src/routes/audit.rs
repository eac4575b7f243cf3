//! Read access to the append-only audit log.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::app::AppState;
use crate::authz::catalog::Permission;
use crate::authz::guard;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::audit::AuditLogEntry;
use crate::store;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// List audit entries, newest first
#[utoipa::path(
    get,
    path = "/audit",
    tag = "Audit",
    params(("limit" = Option<i64>, Query, description = "Maximum entries to return")),
    responses((status = 200, description = "Audit entries, newest first", body = Vec<AuditLogEntry>)),
    security(("bearerAuth" = []))
)]
pub async fn list_audit(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<Vec<AuditLogEntry>>> {
    guard::require(&state.pool, auth.user_id, Permission::CanViewAuditLog).await?;

    if let Some(limit) = query.limit {
        if limit < 0 {
            return Err(AppError::bad_request("limit must be non-negative"));
        }
    }

    let entries = store::audit::list(&state.pool, query.limit).await?;
    Ok(Json(entries))
}
