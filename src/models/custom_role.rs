use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::catalog::{OrgRole, Permission};
use crate::models::audit::Audited;

// =============================================================================
// CUSTOM ROLE
// =============================================================================

/// A named role inheriting the default matrix of its `base_role`, with
/// explicit per-permission overrides layered on top.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomRole {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Never `superadmin`; that role is global and cannot seed a custom role.
    pub base_role: OrgRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Audited for CustomRole {
    fn entity_type() -> &'static str { "custom_role" }
    fn subject_id(&self) -> Uuid { self.id }
}

/// A role together with its overrides, as the resolver consumes it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomRoleDetail {
    #[serde(flatten)]
    pub role: CustomRole,
    pub overrides: Vec<PermissionOverride>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleCreateRequest {
    #[schema(example = "support_lead")]
    pub name: String,
    #[schema(example = "Member permissions plus user visibility")]
    pub description: Option<String>,
    pub base_role: OrgRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Deactivation keeps the role and its overrides; assignees fall back to
    /// their org role until it is reactivated.
    pub is_active: Option<bool>,
}

// =============================================================================
// PERMISSION OVERRIDE
// =============================================================================

/// An explicit allow/deny pin for one permission on one custom role. One row
/// per (role, permission); setting again replaces the value.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionOverride {
    pub role_id: Uuid,
    pub permission: Permission,
    pub allowed: bool,
    pub created_at: DateTime<Utc>,
}

impl Audited for PermissionOverride {
    fn entity_type() -> &'static str { "permission_override" }
    fn subject_id(&self) -> Uuid { self.role_id }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetOverrideRequest {
    pub permission: Permission,
    pub allowed: bool,
}

// =============================================================================
// ROLE ASSIGNMENT
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleAssignment {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

impl Audited for RoleAssignment {
    fn entity_type() -> &'static str { "role_assignment" }
    fn subject_id(&self) -> Uuid { self.user_id }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRoleRequest {
    pub role_id: Uuid,
}
