//! Enforcement gate for the administrative HTTP surface.
//!
//! Modes mirror the usual rollout path: `off` while bootstrapping an empty
//! store, `advisory` to log would-be denials, `strict` in production.

use std::sync::OnceLock;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::catalog::{OrgRole, Permission};
use crate::authz::roles::EffectivePermissions;
use crate::errors::AppError;
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforceMode {
    Off,
    Advisory,
    Strict,
}

impl EnforceMode {
    pub fn from_env() -> Self {
        static MODE: OnceLock<EnforceMode> = OnceLock::new();
        *MODE.get_or_init(|| {
            match std::env::var("AUTHZ_ENFORCE").unwrap_or_default().to_lowercase().as_str() {
                "advisory" => EnforceMode::Advisory,
                "strict" => EnforceMode::Strict,
                _ => EnforceMode::Off,
            }
        })
    }
}

/// Require `permission` of the acting user before an administrative mutation.
pub async fn require(pool: &SqlitePool, actor_id: Uuid, permission: Permission) -> Result<(), AppError> {
    let mode = EnforceMode::from_env();
    if mode == EnforceMode::Off {
        return Ok(());
    }

    let allowed = actor_allows(pool, actor_id, permission).await?;
    if allowed {
        return Ok(());
    }

    match mode {
        EnforceMode::Advisory => {
            tracing::warn!(
                actor_id = %actor_id,
                permission = permission.as_str(),
                "advisory mode: would deny"
            );
            Ok(())
        }
        _ => Err(AppError::forbidden(format!("requires {}", permission.as_str()))),
    }
}

async fn actor_allows(pool: &SqlitePool, actor_id: Uuid, permission: Permission) -> Result<bool, AppError> {
    let Some(actor) = store::users::find(pool, actor_id).await? else {
        return Ok(false);
    };

    if actor.org_role == OrgRole::Superadmin {
        return Ok(true);
    }

    let custom_role = match actor.custom_role_id {
        Some(role_id) => store::roles::find_detail(pool, role_id).await?,
        None => None,
    };

    Ok(EffectivePermissions::resolve(actor.org_role, custom_role.as_ref()).allows(permission))
}
