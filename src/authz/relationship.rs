//! Relationship resolver: the user's standing toward one specific resource
//! instance.

use uuid::Uuid;

use crate::authz::catalog::AccessLevel;
use crate::models::grant::ShareGrant;
use crate::models::resource::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Owner,
    Shared(AccessLevel),
    /// The original owner of a transferred resource. Read-only from here on.
    TransferredAway,
    Unrelated,
}

/// Evaluation order matters: a transferred-away original owner must never be
/// reported as `Owner`, whatever grants they still hold.
pub fn resolve(user_id: Uuid, resource: &Resource, grant: Option<&ShareGrant>) -> Relationship {
    if resource.is_transferred && resource.owner_id == user_id {
        return Relationship::TransferredAway;
    }

    if resource.current_owner_id() == user_id {
        return Relationship::Owner;
    }

    if let Some(grant) = grant {
        return Relationship::Shared(grant.access_level);
    }

    Relationship::Unrelated
}
