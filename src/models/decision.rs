use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::catalog::{Action, ResourceType};
use crate::authz::engine::DenyReason;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DecideRequest {
    pub user_id: Uuid,
    pub action: Action,
    pub resource_type: ResourceType,
    /// Required for every action except `create`.
    pub resource_id: Option<Uuid>,
    /// Target department for `create` decisions.
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DecisionResponse {
    pub allow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}
