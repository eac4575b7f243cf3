//! Custom roles and their permission overrides.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::catalog::{OrgRole, Permission};
use crate::db::rows;
use crate::errors::AppError;
use crate::models::custom_role::{
    CustomRole, CustomRoleDetail, PermissionOverride, RoleCreateRequest, RoleUpdateRequest,
};
use crate::store::audit::{self, NewAuditEntry};

const SELECT: &str =
    "SELECT id, name, description, base_role, is_active, created_at, updated_at FROM custom_roles";
const SELECT_OVERRIDE: &str =
    "SELECT role_id, permission, allowed, created_at FROM permission_overrides";

pub async fn create(
    pool: &SqlitePool,
    actor_id: Option<Uuid>,
    req: RoleCreateRequest,
) -> Result<CustomRole, AppError> {
    if req.base_role == OrgRole::Superadmin {
        return Err(AppError::bad_request("custom roles cannot be based on superadmin"));
    }

    let now = Utc::now();
    let role = CustomRole {
        id: Uuid::new_v4(),
        name: req.name,
        description: req.description,
        base_role: req.base_role,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO custom_roles (id, name, description, base_role, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(role.id.to_string())
    .bind(&role.name)
    .bind(&role.description)
    .bind(role.base_role.as_str())
    .bind(role.is_active)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(&mut *tx)
    .await
    .map_err(|e| super::map_unique(e, "role name already exists"))?;

    audit::record(&mut tx, NewAuditEntry::created(actor_id, &role)).await?;

    tx.commit().await?;
    Ok(role)
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> Result<Option<CustomRole>, AppError> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(rows::custom_role_from_row).transpose()
}

/// Role plus overrides, as the role resolver consumes it.
pub async fn find_detail(pool: &SqlitePool, id: Uuid) -> Result<Option<CustomRoleDetail>, AppError> {
    let Some(role) = find(pool, id).await? else {
        return Ok(None);
    };

    let overrides = list_overrides(pool, id).await?;
    Ok(Some(CustomRoleDetail { role, overrides }))
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<CustomRole>, AppError> {
    let rows_ = sqlx::query(&format!("{} ORDER BY name", SELECT))
        .fetch_all(pool)
        .await?;

    rows_.iter().map(rows::custom_role_from_row).collect()
}

pub async fn update(
    pool: &SqlitePool,
    actor_id: Option<Uuid>,
    id: Uuid,
    req: RoleUpdateRequest,
) -> Result<CustomRole, AppError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT))
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("custom role not found"))?;
    let old = rows::custom_role_from_row(&row)?;

    let mut role = old.clone();
    if let Some(name) = req.name {
        role.name = name;
    }
    if req.description.is_some() {
        role.description = req.description;
    }
    if let Some(is_active) = req.is_active {
        role.is_active = is_active;
    }
    role.updated_at = Utc::now();

    sqlx::query("UPDATE custom_roles SET name = ?, description = ?, is_active = ?, updated_at = ? WHERE id = ?")
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.is_active)
        .bind(role.updated_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| super::map_unique(e, "role name already exists"))?;

    audit::record(&mut tx, NewAuditEntry::updated(actor_id, &old, &role)).await?;

    tx.commit().await?;
    Ok(role)
}

/// Delete a role, its overrides, and any assignments pointing at it.
/// Assignees fall back to their plain org role.
pub async fn delete(pool: &SqlitePool, actor_id: Option<Uuid>, id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT))
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("custom role not found"))?;
    let old = rows::custom_role_from_row(&row)?;

    sqlx::query("UPDATE users SET custom_role_id = NULL WHERE custom_role_id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM permission_overrides WHERE role_id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM custom_roles WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    audit::record(&mut tx, NewAuditEntry::deleted(actor_id, &old)).await?;

    tx.commit().await?;
    Ok(())
}

/// Set (or replace) the override for one (role, permission) pair.
pub async fn set_override(
    pool: &SqlitePool,
    actor_id: Option<Uuid>,
    role_id: Uuid,
    permission: Permission,
    allowed: bool,
) -> Result<PermissionOverride, AppError> {
    let mut tx = pool.begin().await?;

    let role_exists = sqlx::query("SELECT id FROM custom_roles WHERE id = ?")
        .bind(role_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
    if !role_exists {
        return Err(AppError::not_found("custom role not found"));
    }

    let old = sqlx::query(&format!("{} WHERE role_id = ? AND permission = ?", SELECT_OVERRIDE))
        .bind(role_id.to_string())
        .bind(permission.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .as_ref()
        .map(rows::override_from_row)
        .transpose()?;

    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO permission_overrides (role_id, permission, allowed, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(role_id, permission) DO UPDATE SET allowed = excluded.allowed
        "#,
    )
    .bind(role_id.to_string())
    .bind(permission.as_str())
    .bind(allowed)
    .bind(now.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    let new = PermissionOverride {
        role_id,
        permission,
        allowed,
        created_at: old.as_ref().map(|o| o.created_at).unwrap_or(now),
    };

    let entry = match &old {
        Some(old) => NewAuditEntry::updated(actor_id, old, &new),
        None => NewAuditEntry::created(actor_id, &new),
    };
    audit::record(&mut tx, entry.with_permission(permission)).await?;

    tx.commit().await?;
    Ok(new)
}

/// Remove an override, reverting the permission to the base role's default.
pub async fn remove_override(
    pool: &SqlitePool,
    actor_id: Option<Uuid>,
    role_id: Uuid,
    permission: Permission,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let old = sqlx::query(&format!("{} WHERE role_id = ? AND permission = ?", SELECT_OVERRIDE))
        .bind(role_id.to_string())
        .bind(permission.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .as_ref()
        .map(rows::override_from_row)
        .transpose()?
        .ok_or_else(|| AppError::not_found("override not found"))?;

    sqlx::query("DELETE FROM permission_overrides WHERE role_id = ? AND permission = ?")
        .bind(role_id.to_string())
        .bind(permission.as_str())
        .execute(&mut *tx)
        .await?;

    audit::record(&mut tx, NewAuditEntry::deleted(actor_id, &old).with_permission(permission)).await?;

    tx.commit().await?;
    Ok(())
}

pub async fn list_overrides(pool: &SqlitePool, role_id: Uuid) -> Result<Vec<PermissionOverride>, AppError> {
    let rows_ = sqlx::query(&format!("{} WHERE role_id = ? ORDER BY permission", SELECT_OVERRIDE))
        .bind(role_id.to_string())
        .fetch_all(pool)
        .await?;

    rows_.iter().map(rows::override_from_row).collect()
}
