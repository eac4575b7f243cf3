//! Sharing grants: one row per (resource, shared-with user).

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::catalog::ResourceType;
use crate::db::rows;
use crate::errors::AppError;
use crate::models::grant::{GrantCreateRequest, ShareGrant};
use crate::store::audit::{self, NewAuditEntry};

const SELECT: &str =
    "SELECT resource_type, resource_id, shared_with_id, access_level, note, created_at FROM share_grants";

pub async fn create(
    pool: &SqlitePool,
    actor_id: Option<Uuid>,
    resource_type: ResourceType,
    resource_id: Uuid,
    req: GrantCreateRequest,
) -> Result<ShareGrant, AppError> {
    let mut tx = pool.begin().await?;

    let resource_exists = sqlx::query("SELECT id FROM resources WHERE resource_type = ? AND id = ?")
        .bind(resource_type.as_str())
        .bind(resource_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
    if !resource_exists {
        return Err(AppError::not_found("resource not found"));
    }

    let grantee_exists = sqlx::query("SELECT id FROM users WHERE id = ?")
        .bind(req.shared_with_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
    if !grantee_exists {
        return Err(AppError::not_found("grantee not found"));
    }

    let grant = ShareGrant {
        resource_type,
        resource_id,
        shared_with_id: req.shared_with_id,
        access_level: req.access_level,
        note: req.note,
        created_at: Utc::now(),
    };

    // The primary key backs this up if two creates race.
    sqlx::query(
        "INSERT INTO share_grants (resource_type, resource_id, shared_with_id, access_level, note, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(resource_type.as_str())
    .bind(resource_id.to_string())
    .bind(grant.shared_with_id.to_string())
    .bind(grant.access_level.as_str())
    .bind(&grant.note)
    .bind(grant.created_at.to_rfc3339())
    .execute(&mut *tx)
    .await
    .map_err(|e| super::map_unique(e, "grant already exists for this user"))?;

    audit::record(&mut tx, NewAuditEntry::created(actor_id, &grant)).await?;

    tx.commit().await?;
    Ok(grant)
}

pub async fn find(
    pool: &SqlitePool,
    resource_type: ResourceType,
    resource_id: Uuid,
    user_id: Uuid,
) -> Result<Option<ShareGrant>, AppError> {
    let row = sqlx::query(&format!(
        "{} WHERE resource_type = ? AND resource_id = ? AND shared_with_id = ?",
        SELECT
    ))
    .bind(resource_type.as_str())
    .bind(resource_id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(rows::grant_from_row).transpose()
}

pub async fn list_for_resource(
    pool: &SqlitePool,
    resource_type: ResourceType,
    resource_id: Uuid,
) -> Result<Vec<ShareGrant>, AppError> {
    let rows_ = sqlx::query(&format!(
        "{} WHERE resource_type = ? AND resource_id = ? ORDER BY created_at",
        SELECT
    ))
    .bind(resource_type.as_str())
    .bind(resource_id.to_string())
    .fetch_all(pool)
    .await?;

    rows_.iter().map(rows::grant_from_row).collect()
}

pub async fn revoke(
    pool: &SqlitePool,
    actor_id: Option<Uuid>,
    resource_type: ResourceType,
    resource_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let old = sqlx::query(&format!(
        "{} WHERE resource_type = ? AND resource_id = ? AND shared_with_id = ?",
        SELECT
    ))
    .bind(resource_type.as_str())
    .bind(resource_id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(&mut *tx)
    .await?
    .as_ref()
    .map(rows::grant_from_row)
    .transpose()?
    .ok_or_else(|| AppError::not_found("grant not found"))?;

    sqlx::query("DELETE FROM share_grants WHERE resource_type = ? AND resource_id = ? AND shared_with_id = ?")
        .bind(resource_type.as_str())
        .bind(resource_id.to_string())
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    audit::record(&mut tx, NewAuditEntry::deleted(actor_id, &old)).await?;

    tx.commit().await?;
    Ok(())
}
