//! Identity snapshots and custom-role assignment.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::rows;
use crate::errors::AppError;
use crate::models::custom_role::RoleAssignment;
use crate::models::user::{User, UserCreateRequest};
use crate::store::audit::{self, NewAuditEntry};

const SELECT: &str =
    "SELECT id, display_name, org_role, custom_role_id, department_id, created_at, updated_at FROM users";

pub async fn create(pool: &SqlitePool, req: UserCreateRequest) -> Result<User, AppError> {
    let id = req.id.unwrap_or_else(Uuid::new_v4);
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO users (id, display_name, org_role, custom_role_id, department_id, created_at, updated_at) VALUES (?, ?, ?, NULL, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&req.display_name)
    .bind(req.org_role.as_str())
    .bind(req.department_id.map(|d| d.to_string()))
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| super::map_unique(e, "user already exists"))?;

    Ok(User {
        id,
        display_name: req.display_name,
        org_role: req.org_role,
        custom_role_id: None,
        department_id: req.department_id,
        created_at: now,
        updated_at: now,
    })
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, AppError> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(rows::user_from_row).transpose()
}

/// Assign a custom role. One active assignment per user; swapping requires an
/// explicit unassign first, so both halves land in the audit log.
pub async fn assign_role(
    pool: &SqlitePool,
    actor_id: Option<Uuid>,
    user_id: Uuid,
    role_id: Uuid,
) -> Result<User, AppError> {
    let mut tx = pool.begin().await?;

    let user_row = sqlx::query(&format!("{} WHERE id = ?", SELECT))
        .bind(user_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    let mut user = rows::user_from_row(&user_row)?;

    if user.custom_role_id.is_some() {
        return Err(AppError::conflict("user already has a custom role; unassign it first"));
    }

    let role_row = sqlx::query("SELECT id, name, description, base_role, is_active, created_at, updated_at FROM custom_roles WHERE id = ?")
        .bind(role_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("custom role not found"))?;
    let role = rows::custom_role_from_row(&role_row)?;

    if !role.is_active {
        return Err(AppError::invalid_state("custom role is deactivated"));
    }

    let now = Utc::now();
    sqlx::query("UPDATE users SET custom_role_id = ?, updated_at = ? WHERE id = ?")
        .bind(role_id.to_string())
        .bind(now.to_rfc3339())
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    let assignment = RoleAssignment { user_id, role_id };
    audit::record(&mut tx, NewAuditEntry::created(actor_id, &assignment)).await?;

    tx.commit().await?;

    user.custom_role_id = Some(role_id);
    user.updated_at = now;
    Ok(user)
}

pub async fn unassign_role(
    pool: &SqlitePool,
    actor_id: Option<Uuid>,
    user_id: Uuid,
) -> Result<User, AppError> {
    let mut tx = pool.begin().await?;

    let user_row = sqlx::query(&format!("{} WHERE id = ?", SELECT))
        .bind(user_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    let mut user = rows::user_from_row(&user_row)?;

    let role_id = user
        .custom_role_id
        .ok_or_else(|| AppError::not_found("no custom role assigned"))?;

    let now = Utc::now();
    sqlx::query("UPDATE users SET custom_role_id = NULL, updated_at = ? WHERE id = ?")
        .bind(now.to_rfc3339())
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    let assignment = RoleAssignment { user_id, role_id };
    audit::record(&mut tx, NewAuditEntry::deleted(actor_id, &assignment)).await?;

    tx.commit().await?;

    user.custom_role_id = None;
    user.updated_at = now;
    Ok(user)
}
