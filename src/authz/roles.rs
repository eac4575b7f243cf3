//! Role resolver: computes the effective permission set for a user from their
//! organization role and, when one is assigned and active, a custom role.
//!
//! The base consulted is always the custom role's own `base_role`, not the
//! user's org role. Assigning an admin a role based on `member` narrows them.

use std::collections::BTreeMap;

use crate::authz::catalog::{default_allows, OrgRole, Permission};
use crate::models::custom_role::CustomRoleDetail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionSource {
    Default,
    Override,
}

#[derive(Debug, Clone)]
pub struct EffectivePermissions {
    entries: BTreeMap<Permission, (bool, PermissionSource)>,
}

impl EffectivePermissions {
    /// Resolve the full map, total over the catalog.
    ///
    /// A custom role that is deactivated is ignored entirely; the user falls
    /// back to their plain org role.
    pub fn resolve(org_role: OrgRole, custom_role: Option<&CustomRoleDetail>) -> Self {
        let active_custom = custom_role.filter(|detail| detail.role.is_active);

        let base_role = active_custom
            .map(|detail| detail.role.base_role)
            .unwrap_or(org_role);

        let mut entries = BTreeMap::new();
        for permission in Permission::ALL {
            entries.insert(
                permission,
                (default_allows(base_role, permission), PermissionSource::Default),
            );
        }

        if let Some(detail) = active_custom {
            for entry in &detail.overrides {
                entries.insert(entry.permission, (entry.allowed, PermissionSource::Override));
            }
        }

        Self { entries }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.entries
            .get(&permission)
            .map(|(allowed, _)| *allowed)
            .unwrap_or(false)
    }

    pub fn source(&self, permission: Permission) -> PermissionSource {
        self.entries
            .get(&permission)
            .map(|(_, source)| *source)
            .unwrap_or(PermissionSource::Default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Permission, bool, PermissionSource)> + '_ {
        self.entries
            .iter()
            .map(|(permission, (allowed, source))| (*permission, *allowed, *source))
    }
}
