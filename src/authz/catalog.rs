//! Permission catalog: the closed set of permission identifiers, their
//! categories, and the default allow matrix per organization role.
//!
//! The catalog is pure data. `superadmin` is deliberately absent from the
//! matrix; callers special-case it before any lookup.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// ORGANIZATION ROLES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    Superadmin,
    Owner,
    Admin,
    SubAdmin,
    Member,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Superadmin => "superadmin",
            OrgRole::Owner => "owner",
            OrgRole::Admin => "admin",
            OrgRole::SubAdmin => "sub_admin",
            OrgRole::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "superadmin" => Some(OrgRole::Superadmin),
            "owner" => Some(OrgRole::Owner),
            "admin" => Some(OrgRole::Admin),
            "sub_admin" => Some(OrgRole::SubAdmin),
            "member" => Some(OrgRole::Member),
            _ => None,
        }
    }

    /// Manager tiers may act on resources they neither own nor were granted,
    /// provided the permission and scope checks already passed.
    pub fn is_manager(&self) -> bool {
        matches!(self, OrgRole::Superadmin | OrgRole::Owner | OrgRole::Admin | OrgRole::SubAdmin)
    }
}

// =============================================================================
// PERMISSIONS
// =============================================================================

/// Permission categories. Metadata only; resolution never consults them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Users,
    Organization,
    Resources,
    Departments,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // Users
    CanViewUsers,
    CanManageUsers,
    CanDeleteUsers,
    // Organization
    CanViewOrganization,
    CanManageOrganization,
    // Resources
    CanCreateResources,
    CanViewResources,
    CanEditResources,
    CanDeleteResources,
    CanShareResources,
    CanTransferResources,
    // Departments
    CanViewDepartments,
    CanManageDepartments,
    // Admin
    CanChangeRoles,
    CanViewAuditLog,
}

impl Permission {
    pub const ALL: [Permission; 15] = [
        Permission::CanViewUsers,
        Permission::CanManageUsers,
        Permission::CanDeleteUsers,
        Permission::CanViewOrganization,
        Permission::CanManageOrganization,
        Permission::CanCreateResources,
        Permission::CanViewResources,
        Permission::CanEditResources,
        Permission::CanDeleteResources,
        Permission::CanShareResources,
        Permission::CanTransferResources,
        Permission::CanViewDepartments,
        Permission::CanManageDepartments,
        Permission::CanChangeRoles,
        Permission::CanViewAuditLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CanViewUsers => "can_view_users",
            Permission::CanManageUsers => "can_manage_users",
            Permission::CanDeleteUsers => "can_delete_users",
            Permission::CanViewOrganization => "can_view_organization",
            Permission::CanManageOrganization => "can_manage_organization",
            Permission::CanCreateResources => "can_create_resources",
            Permission::CanViewResources => "can_view_resources",
            Permission::CanEditResources => "can_edit_resources",
            Permission::CanDeleteResources => "can_delete_resources",
            Permission::CanShareResources => "can_share_resources",
            Permission::CanTransferResources => "can_transfer_resources",
            Permission::CanViewDepartments => "can_view_departments",
            Permission::CanManageDepartments => "can_manage_departments",
            Permission::CanChangeRoles => "can_change_roles",
            Permission::CanViewAuditLog => "can_view_audit_log",
        }
    }

    /// Unknown identifiers yield `None`; every caller treats that as deny.
    pub fn parse(value: &str) -> Option<Self> {
        Permission::ALL.iter().copied().find(|p| p.as_str() == value)
    }

    pub fn category(&self) -> Category {
        match self {
            Permission::CanViewUsers | Permission::CanManageUsers | Permission::CanDeleteUsers => {
                Category::Users
            }
            Permission::CanViewOrganization | Permission::CanManageOrganization => {
                Category::Organization
            }
            Permission::CanCreateResources
            | Permission::CanViewResources
            | Permission::CanEditResources
            | Permission::CanDeleteResources
            | Permission::CanShareResources
            | Permission::CanTransferResources => Category::Resources,
            Permission::CanViewDepartments | Permission::CanManageDepartments => {
                Category::Departments
            }
            Permission::CanChangeRoles | Permission::CanViewAuditLog => Category::Admin,
        }
    }
}

/// Default allow matrix. `superadmin` short-circuits before lookup; the arm
/// here only keeps the function total.
pub fn default_allows(role: OrgRole, permission: Permission) -> bool {
    use Permission::*;

    match role {
        OrgRole::Superadmin => true,
        OrgRole::Owner => true,
        OrgRole::Admin => !matches!(permission, CanManageOrganization),
        OrgRole::SubAdmin => matches!(
            permission,
            CanViewUsers
                | CanViewOrganization
                | CanCreateResources
                | CanViewResources
                | CanEditResources
                | CanDeleteResources
                | CanShareResources
                | CanTransferResources
                | CanViewDepartments
        ),
        OrgRole::Member => matches!(
            permission,
            CanViewUsers
                | CanCreateResources
                | CanViewResources
                | CanEditResources
                | CanDeleteResources
                | CanShareResources
                | CanTransferResources
                | CanViewDepartments
        ),
    }
}

// =============================================================================
// ACTIONS AND ACCESS LEVELS
// =============================================================================

/// Grant strength attached to a sharing grant. Totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    View,
    Edit,
    Full,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::View => "view",
            AccessLevel::Edit => "edit",
            AccessLevel::Full => "full",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "view" => Some(AccessLevel::View),
            "edit" => Some(AccessLevel::Edit),
            "full" => Some(AccessLevel::Full),
            _ => None,
        }
    }
}

/// Protected entity kinds. The action-to-permission mapping is uniform within
/// a kind so every screen resolves the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Contact,
    Chat,
    Call,
    Department,
    User,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Contact => "contact",
            ResourceType::Chat => "chat",
            ResourceType::Call => "call",
            ResourceType::Department => "department",
            ResourceType::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "contact" => Some(ResourceType::Contact),
            "chat" => Some(ResourceType::Chat),
            "call" => Some(ResourceType::Call),
            "department" => Some(ResourceType::Department),
            "user" => Some(ResourceType::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Share,
    Transfer,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Share => "share",
            Action::Transfer => "transfer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "view" => Some(Action::View),
            "create" => Some(Action::Create),
            "edit" => Some(Action::Edit),
            "delete" => Some(Action::Delete),
            "share" => Some(Action::Share),
            "transfer" => Some(Action::Transfer),
            _ => None,
        }
    }

    /// The catalog permission this action requires on the given resource kind.
    pub fn required_permission(self, resource_type: ResourceType) -> Permission {
        use Permission::*;

        match resource_type {
            ResourceType::User => match self {
                Action::View => CanViewUsers,
                Action::Create | Action::Edit => CanManageUsers,
                Action::Delete => CanDeleteUsers,
                Action::Share => CanShareResources,
                Action::Transfer => CanTransferResources,
            },
            ResourceType::Department => match self {
                Action::View => CanViewDepartments,
                Action::Create | Action::Edit | Action::Delete => CanManageDepartments,
                Action::Share => CanShareResources,
                Action::Transfer => CanTransferResources,
            },
            ResourceType::Contact | ResourceType::Chat | ResourceType::Call => match self {
                Action::View => CanViewResources,
                Action::Create => CanCreateResources,
                Action::Edit => CanEditResources,
                Action::Delete => CanDeleteResources,
                Action::Share => CanShareResources,
                Action::Transfer => CanTransferResources,
            },
        }
    }

    /// Minimum grant strength a shared-with user needs for this action.
    /// `Create` has no resource instance and therefore no level.
    pub fn required_access(self) -> Option<AccessLevel> {
        match self {
            Action::View => Some(AccessLevel::View),
            Action::Edit => Some(AccessLevel::Edit),
            Action::Delete | Action::Share | Action::Transfer => Some(AccessLevel::Full),
            Action::Create => None,
        }
    }
}
