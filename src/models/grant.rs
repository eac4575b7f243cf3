use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::catalog::{AccessLevel, ResourceType};
use crate::models::audit::Audited;

/// A sharing grant: one row per (resource, shared-with user). Grants never
/// move ownership and revoke independently of transfer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShareGrant {
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
    pub shared_with_id: Uuid,
    pub access_level: AccessLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Audited for ShareGrant {
    fn entity_type() -> &'static str { "share_grant" }
    fn subject_id(&self) -> Uuid { self.resource_id }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantCreateRequest {
    pub shared_with_id: Uuid,
    pub access_level: AccessLevel,
    #[schema(example = "Covering while on leave")]
    pub note: Option<String>,
}
