use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::catalog::{Category, OrgRole, Permission};

/// Identity snapshot consumed by the resolver. Mirrors the external identity
/// store; this service never authenticates users, it only reads who they are.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub org_role: OrgRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_role_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserCreateRequest {
    /// Client-supplied id keeps directory sync idempotent; omitted ids are
    /// generated.
    pub id: Option<Uuid>,
    #[schema(example = "Ada Lovelace")]
    pub display_name: String,
    pub org_role: OrgRole,
    pub department_id: Option<Uuid>,
}

// =============================================================================
// EFFECTIVE PERMISSIONS (computed)
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct EffectivePermissionsResponse {
    pub user_id: Uuid,
    pub org_role: OrgRole,
    /// Name of the active custom role, when one is assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_role: Option<String>,
    pub permissions: Vec<PermissionStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionStatus {
    pub permission: Permission,
    pub category: Category,
    pub allowed: bool,
    /// "default" when the base role decides, "override" when a custom-role
    /// override pins the value.
    #[schema(example = "default")]
    pub source: &'static str,
}
