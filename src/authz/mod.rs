//! Authorization policy engine.
//!
//! Four layers, composed by the decision engine:
//! - catalog: closed permission set + default allow matrix per org role
//! - roles: effective permissions (base role defaults + custom-role overrides)
//! - scope: department reach
//! - relationship: standing toward one resource instance
//!
//! Everything in here is a pure function of its inputs; the only I/O lives in
//! `SqlPolicyEngine`, which loads snapshots and delegates to the pure core.

pub mod catalog;
pub mod engine;
pub mod guard;
pub mod relationship;
pub mod roles;
pub mod scope;

pub use catalog::{AccessLevel, Action, Category, OrgRole, Permission, ResourceType};
pub use engine::{decide, Decision, DenyReason, PolicyEngine, SqlPolicyEngine, Target, TargetRef};
pub use relationship::Relationship;
pub use roles::{EffectivePermissions, PermissionSource};
