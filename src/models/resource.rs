use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::catalog::ResourceType;
use crate::models::audit::Audited;

/// Protected-resource metadata snapshot: ownership, department, transfer
/// state. The resource's payload lives elsewhere; the resolver only needs
/// this envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Resource {
    pub resource_type: ResourceType,
    pub id: Uuid,
    /// The original owner. Unchanged by transfer so the transferred-away
    /// relationship stays derivable.
    pub owner_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
    pub is_transferred: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transferred_to_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// The user who owns the resource today: the transferee once a transfer
    /// happened, the original owner otherwise.
    pub fn current_owner_id(&self) -> Uuid {
        if self.is_transferred {
            self.transferred_to_id.unwrap_or(self.owner_id)
        } else {
            self.owner_id
        }
    }
}

impl Audited for Resource {
    fn entity_type() -> &'static str { "resource" }
    fn subject_id(&self) -> Uuid { self.id }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResourceRegisterRequest {
    pub resource_type: ResourceType,
    /// Client-supplied id keeps registration idempotent with the upstream
    /// store; omitted ids are generated.
    pub id: Option<Uuid>,
    pub owner_id: Uuid,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub to_user_id: Uuid,
}
