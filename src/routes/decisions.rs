//! The engine's one public entry point.

use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::catalog::Action;
use crate::authz::engine::{PolicyEngine, SqlPolicyEngine, TargetRef};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::decision::{DecideRequest, DecisionResponse};

#[utoipa::path(
    post,
    path = "/decide",
    tag = "Decisions",
    request_body = DecideRequest,
    responses(
        (status = 200, description = "Allow/deny verdict", body = DecisionResponse),
        (status = 400, description = "Malformed target"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn decide(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(req): Json<DecideRequest>,
) -> AppResult<Json<DecisionResponse>> {
    let target = match (req.action, req.resource_id) {
        (Action::Create, None) => TargetRef::New {
            resource_type: req.resource_type,
            department_id: req.department_id,
        },
        (Action::Create, Some(_)) => {
            return Err(AppError::bad_request("create decisions take no resource_id"));
        }
        (_, Some(resource_id)) => TargetRef::Existing {
            resource_type: req.resource_type,
            resource_id,
        },
        (_, None) => {
            return Err(AppError::bad_request("resource_id is required for this action"));
        }
    };

    let engine = SqlPolicyEngine::new(state.pool.clone());
    let decision = engine.decide(req.user_id, req.action, target).await?;

    Ok(Json(DecisionResponse {
        allow: decision.allow,
        reason: decision.reason,
    }))
}
