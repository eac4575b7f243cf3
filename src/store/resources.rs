//! Protected-resource metadata snapshots and ownership transfer.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::catalog::ResourceType;
use crate::db::rows;
use crate::errors::AppError;
use crate::models::resource::{Resource, ResourceRegisterRequest};
use crate::store::audit::{self, NewAuditEntry};

const SELECT: &str =
    "SELECT resource_type, id, owner_id, department_id, is_transferred, transferred_to_id, created_at, updated_at FROM resources";

pub async fn register(pool: &SqlitePool, req: ResourceRegisterRequest) -> Result<Resource, AppError> {
    let owner = super::users::find(pool, req.owner_id)
        .await?
        .ok_or_else(|| AppError::not_found("owner not found"))?;

    let now = Utc::now();
    let resource = Resource {
        resource_type: req.resource_type,
        id: req.id.unwrap_or_else(Uuid::new_v4),
        owner_id: owner.id,
        department_id: req.department_id,
        is_transferred: false,
        transferred_to_id: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO resources (resource_type, id, owner_id, department_id, is_transferred, transferred_to_id, created_at, updated_at) VALUES (?, ?, ?, ?, 0, NULL, ?, ?)",
    )
    .bind(resource.resource_type.as_str())
    .bind(resource.id.to_string())
    .bind(resource.owner_id.to_string())
    .bind(resource.department_id.map(|d| d.to_string()))
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| super::map_unique(e, "resource already registered"))?;

    Ok(resource)
}

pub async fn find(
    pool: &SqlitePool,
    resource_type: ResourceType,
    id: Uuid,
) -> Result<Option<Resource>, AppError> {
    let row = sqlx::query(&format!("{} WHERE resource_type = ? AND id = ?", SELECT))
        .bind(resource_type.as_str())
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(rows::resource_from_row).transpose()
}

/// One-way ownership transfer. The original owner keeps read access only;
/// the transferee becomes the owner. Cannot be repeated or reversed.
pub async fn transfer(
    pool: &SqlitePool,
    actor_id: Option<Uuid>,
    resource_type: ResourceType,
    id: Uuid,
    to_user_id: Uuid,
) -> Result<Resource, AppError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(&format!("{} WHERE resource_type = ? AND id = ?", SELECT))
        .bind(resource_type.as_str())
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("resource not found"))?;
    let old = rows::resource_from_row(&row)?;

    if old.is_transferred {
        return Err(AppError::invalid_state("resource has already been transferred"));
    }

    let transferee_exists = sqlx::query("SELECT id FROM users WHERE id = ?")
        .bind(to_user_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
    if !transferee_exists {
        return Err(AppError::not_found("transferee not found"));
    }
    if to_user_id == old.owner_id {
        return Err(AppError::bad_request("cannot transfer a resource to its owner"));
    }

    let now = Utc::now();
    sqlx::query(
        "UPDATE resources SET is_transferred = 1, transferred_to_id = ?, updated_at = ? WHERE resource_type = ? AND id = ?",
    )
    .bind(to_user_id.to_string())
    .bind(now.to_rfc3339())
    .bind(resource_type.as_str())
    .bind(id.to_string())
    .execute(&mut *tx)
    .await?;

    let mut new = old.clone();
    new.is_transferred = true;
    new.transferred_to_id = Some(to_user_id);
    new.updated_at = now;

    audit::record(&mut tx, NewAuditEntry::updated(actor_id, &old, &new)).await?;

    tx.commit().await?;
    Ok(new)
}
