//! Append-only audit log.
//!
//! Entries are written inside the caller's transaction and chained with
//! SHA-256 (`hash = sha256(prev_hash || payload)`), so the log is immutable
//! in spirit and tamper-evident in practice. There is no update or delete.

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::authz::catalog::Permission;
use crate::db::rows;
use crate::errors::AppError;
use crate::models::audit::{AuditAction, AuditLogEntry, Audited};

/// A not-yet-recorded audit entry. Built from the mutated entity via the
/// `Audited` trait so call sites stay one-liners.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub entity_type: &'static str,
    pub action: AuditAction,
    pub permission: Option<Permission>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub actor_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
}

impl NewAuditEntry {
    pub fn created<T: Audited>(actor_id: Option<Uuid>, entity: &T) -> Self {
        Self {
            entity_type: T::entity_type(),
            action: AuditAction::Create,
            permission: None,
            old_value: None,
            new_value: serde_json::to_value(entity).ok(),
            actor_id,
            subject_id: Some(entity.subject_id()),
        }
    }

    pub fn updated<T: Audited>(actor_id: Option<Uuid>, old: &T, new: &T) -> Self {
        Self {
            entity_type: T::entity_type(),
            action: AuditAction::Update,
            permission: None,
            old_value: serde_json::to_value(old).ok(),
            new_value: serde_json::to_value(new).ok(),
            actor_id,
            subject_id: Some(new.subject_id()),
        }
    }

    pub fn deleted<T: Audited>(actor_id: Option<Uuid>, old: &T) -> Self {
        Self {
            entity_type: T::entity_type(),
            action: AuditAction::Delete,
            permission: None,
            old_value: serde_json::to_value(old).ok(),
            new_value: None,
            actor_id,
            subject_id: Some(old.subject_id()),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }
}

/// The byte string each hash covers. Must be reproducible from the stored
/// columns alone so the chain can be re-verified later.
fn payload_string(
    entity_type: &str,
    action: &str,
    permission: Option<&str>,
    old_value: Option<&str>,
    new_value: Option<&str>,
    actor_id: Option<&str>,
    subject_id: Option<&str>,
    created_at: &str,
) -> String {
    serde_json::json!({
        "entity_type": entity_type,
        "action": action,
        "permission": permission,
        "old_value": old_value,
        "new_value": new_value,
        "actor_id": actor_id,
        "subject_id": subject_id,
        "created_at": created_at,
    })
    .to_string()
}

fn chain_hash(prev_hash: Option<&str>, payload: &str) -> String {
    let mut hasher = Sha256::new();
    if let Some(prev) = prev_hash {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Append one entry inside the caller's transaction. The entry only becomes
/// visible if the surrounding mutation commits.
pub async fn record(
    tx: &mut Transaction<'_, Sqlite>,
    entry: NewAuditEntry,
) -> Result<AuditLogEntry, AppError> {
    let id = Uuid::new_v4();
    let created_at = Utc::now();
    let created_at_s = created_at.to_rfc3339();

    let prev_hash: Option<String> =
        sqlx::query_scalar("SELECT hash FROM audit_log ORDER BY rowid DESC LIMIT 1")
            .fetch_optional(&mut **tx)
            .await?;

    let permission_s = entry.permission.map(|p| p.as_str().to_string());
    let old_s = entry.old_value.as_ref().map(|v| v.to_string());
    let new_s = entry.new_value.as_ref().map(|v| v.to_string());
    let actor_s = entry.actor_id.map(|u| u.to_string());
    let subject_s = entry.subject_id.map(|u| u.to_string());

    let payload = payload_string(
        entry.entity_type,
        entry.action.as_str(),
        permission_s.as_deref(),
        old_s.as_deref(),
        new_s.as_deref(),
        actor_s.as_deref(),
        subject_s.as_deref(),
        &created_at_s,
    );
    let hash = chain_hash(prev_hash.as_deref(), &payload);

    sqlx::query(
        r#"
        INSERT INTO audit_log (id, entity_type, action, permission, old_value, new_value, actor_id, subject_id, prev_hash, hash, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(entry.entity_type)
    .bind(entry.action.as_str())
    .bind(&permission_s)
    .bind(&old_s)
    .bind(&new_s)
    .bind(&actor_s)
    .bind(&subject_s)
    .bind(&prev_hash)
    .bind(&hash)
    .bind(&created_at_s)
    .execute(&mut **tx)
    .await?;

    Ok(AuditLogEntry {
        id,
        entity_type: entry.entity_type.to_string(),
        action: entry.action,
        permission: entry.permission,
        old_value: entry.old_value,
        new_value: entry.new_value,
        actor_id: entry.actor_id,
        subject_id: entry.subject_id,
        prev_hash,
        hash,
        created_at,
    })
}

/// Newest first. `limit` of `None` returns the full log.
pub async fn list(pool: &SqlitePool, limit: Option<i64>) -> Result<Vec<AuditLogEntry>, AppError> {
    let rows_ = sqlx::query(
        r#"
        SELECT id, entity_type, action, permission, old_value, new_value, actor_id, subject_id, prev_hash, hash, created_at
        FROM audit_log
        ORDER BY rowid DESC
        LIMIT ?
        "#,
    )
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    rows_.iter().map(rows::audit_entry_from_row).collect()
}

/// Walk the whole chain oldest-first, recomputing every hash. Returns the
/// number of verified entries.
pub async fn verify_chain(pool: &SqlitePool) -> Result<usize, AppError> {
    use sqlx::Row;

    let rows = sqlx::query(
        r#"
        SELECT id, entity_type, action, permission, old_value, new_value, actor_id, subject_id, prev_hash, hash, created_at
        FROM audit_log
        ORDER BY rowid ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut expected_prev: Option<String> = None;
    for row in &rows {
        let id: String = row.try_get("id").map_err(AppError::Database)?;
        let prev_hash: Option<String> = row.try_get("prev_hash").map_err(AppError::Database)?;
        let hash: String = row.try_get("hash").map_err(AppError::Database)?;

        if prev_hash != expected_prev {
            return Err(AppError::internal(format!("audit chain broken before entry {}", id)));
        }

        let entity_type: String = row.try_get("entity_type").map_err(AppError::Database)?;
        let action: String = row.try_get("action").map_err(AppError::Database)?;
        let permission: Option<String> = row.try_get("permission").map_err(AppError::Database)?;
        let old_value: Option<String> = row.try_get("old_value").map_err(AppError::Database)?;
        let new_value: Option<String> = row.try_get("new_value").map_err(AppError::Database)?;
        let actor_id: Option<String> = row.try_get("actor_id").map_err(AppError::Database)?;
        let subject_id: Option<String> = row.try_get("subject_id").map_err(AppError::Database)?;
        let created_at: String = row.try_get("created_at").map_err(AppError::Database)?;

        let payload = payload_string(
            &entity_type,
            &action,
            permission.as_deref(),
            old_value.as_deref(),
            new_value.as_deref(),
            actor_id.as_deref(),
            subject_id.as_deref(),
            &created_at,
        );
        if chain_hash(prev_hash.as_deref(), &payload) != hash {
            return Err(AppError::internal(format!("audit entry {} hash mismatch", id)));
        }

        expected_prev = Some(hash);
    }

    Ok(rows.len())
}
