//! Decision engine: composes the role, scope, and relationship resolvers into
//! a single allow/deny verdict per (user, action, resource).
//!
//! Evaluation order, short-circuiting at the first conclusive step:
//! 1. superadmin -> allow
//! 2. effective permission missing -> deny (permission_denied)
//! 3. department scope fails -> deny (out_of_scope)
//! 4. relationship tier decides the rest -> allow or deny (not_authorized)
//!
//! The engine never mutates state and is safe to call concurrently.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::catalog::{Action, OrgRole, ResourceType};
use crate::authz::relationship::{self, Relationship};
use crate::authz::roles::EffectivePermissions;
use crate::authz::scope;
use crate::errors::AppError;
use crate::models::custom_role::CustomRoleDetail;
use crate::models::grant::ShareGrant;
use crate::models::resource::Resource;
use crate::models::user::User;
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    PermissionDenied,
    OutOfScope,
    NotAuthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Decision {
    pub allow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}

impl Decision {
    pub fn allow() -> Self {
        Self { allow: true, reason: None }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self { allow: false, reason: Some(reason) }
    }
}

/// The instance (or instance-to-be) a decision is about.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Existing {
        resource: &'a Resource,
        /// Org role of the resource's current owner, when that user is known.
        owner_role: Option<OrgRole>,
        grant: Option<&'a ShareGrant>,
    },
    /// A create action: no instance exists yet, only the kind and an optional
    /// destination department.
    New {
        resource_type: ResourceType,
        department_id: Option<Uuid>,
    },
}

impl Target<'_> {
    fn resource_type(&self) -> ResourceType {
        match self {
            Target::Existing { resource, .. } => resource.resource_type,
            Target::New { resource_type, .. } => *resource_type,
        }
    }

    fn department_id(&self) -> Option<Uuid> {
        match self {
            Target::Existing { resource, .. } => resource.department_id,
            Target::New { department_id, .. } => *department_id,
        }
    }
}

/// Pure verdict over fully-loaded snapshots. No I/O, no side effects.
pub fn decide(
    user: &User,
    custom_role: Option<&CustomRoleDetail>,
    action: Action,
    target: Target<'_>,
) -> Decision {
    // 1. Global override. Used sparingly, for cross-tenant administration.
    if user.org_role == OrgRole::Superadmin {
        return Decision::allow();
    }

    // 2. Role grants the permission the action needs?
    let required = action.required_permission(target.resource_type());
    let effective = EffectivePermissions::resolve(user.org_role, custom_role);
    if !effective.allows(required) {
        tracing::debug!(
            user_id = %user.id,
            action = action.as_str(),
            permission = required.as_str(),
            "permission denied"
        );
        return Decision::deny(DenyReason::PermissionDenied);
    }

    // 3. Department reach.
    let owner_role = match target {
        Target::Existing { owner_role, .. } => owner_role,
        Target::New { .. } => None,
    };
    if !scope::in_scope(user.org_role, user.department_id, target.department_id(), owner_role) {
        tracing::debug!(user_id = %user.id, action = action.as_str(), "out of scope");
        return Decision::deny(DenyReason::OutOfScope);
    }

    // 4. Standing toward the instance. Creates have none to check.
    let Target::Existing { resource, grant, .. } = target else {
        return Decision::allow();
    };

    match relationship::resolve(user.id, resource, grant) {
        Relationship::TransferredAway => {
            if action == Action::View {
                Decision::allow()
            } else {
                tracing::debug!(user_id = %user.id, resource_id = %resource.id, "transferred away");
                Decision::deny(DenyReason::NotAuthorized)
            }
        }
        Relationship::Owner => Decision::allow(),
        Relationship::Shared(level) => match action.required_access() {
            Some(required) if required <= level => Decision::allow(),
            Some(_) => {
                tracing::debug!(
                    user_id = %user.id,
                    resource_id = %resource.id,
                    level = level.as_str(),
                    "grant level insufficient"
                );
                Decision::deny(DenyReason::NotAuthorized)
            }
            None => Decision::allow(),
        },
        Relationship::Unrelated => {
            // Role-level authority over others' resources is the one path
            // that substitutes for a resource-level relationship.
            if user.org_role.is_manager() {
                Decision::allow()
            } else {
                tracing::debug!(user_id = %user.id, resource_id = %resource.id, "unrelated");
                Decision::deny(DenyReason::NotAuthorized)
            }
        }
    }
}

/// What a caller points the engine at, before snapshots are loaded.
#[derive(Debug, Clone, Copy)]
pub enum TargetRef {
    Existing {
        resource_type: ResourceType,
        resource_id: Uuid,
    },
    New {
        resource_type: ResourceType,
        department_id: Option<Uuid>,
    },
}

/// Policy engine trait for pluggable decision backends.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    async fn decide(&self, user_id: Uuid, action: Action, target: TargetRef) -> Result<Decision, AppError>;
}

/// Engine backed by the sqlx store. Loads the user, custom role, resource
/// metadata, owner role, and share grant, then delegates to the pure core.
#[derive(Debug, Clone)]
pub struct SqlPolicyEngine {
    pool: SqlitePool,
}

impl SqlPolicyEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyEngine for SqlPolicyEngine {
    async fn decide(&self, user_id: Uuid, action: Action, target: TargetRef) -> Result<Decision, AppError> {
        let Some(user) = store::users::find(&self.pool, user_id).await? else {
            // Unknown users hold no role, hence no permissions.
            tracing::debug!(%user_id, "decision for unknown user");
            return Ok(Decision::deny(DenyReason::PermissionDenied));
        };

        let custom_role = match user.custom_role_id {
            Some(role_id) => store::roles::find_detail(&self.pool, role_id).await?,
            None => None,
        };

        match target {
            TargetRef::New { resource_type, department_id } => Ok(decide(
                &user,
                custom_role.as_ref(),
                action,
                Target::New { resource_type, department_id },
            )),
            TargetRef::Existing { resource_type, resource_id } => {
                let Some(resource) =
                    store::resources::find(&self.pool, resource_type, resource_id).await?
                else {
                    // No metadata, no establishable relationship.
                    tracing::debug!(%resource_id, "decision for unknown resource");
                    return Ok(Decision::deny(DenyReason::NotAuthorized));
                };

                let owner_role = store::users::find(&self.pool, resource.current_owner_id())
                    .await?
                    .map(|owner| owner.org_role);

                let grant =
                    store::grants::find(&self.pool, resource_type, resource_id, user_id).await?;

                Ok(decide(
                    &user,
                    custom_role.as_ref(),
                    action,
                    Target::Existing {
                        resource: &resource,
                        owner_role,
                        grant: grant.as_ref(),
                    },
                ))
            }
        }
    }
}
