//! Row decoding helpers. Ids and enums are stored as TEXT and timestamps as
//! RFC 3339 strings, so every read goes through an explicit parse instead of
//! trusting sqlite's dynamic typing.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::authz::catalog::{AccessLevel, OrgRole, Permission, ResourceType};
use crate::errors::AppError;
use crate::models::audit::{AuditAction, AuditLogEntry};
use crate::models::custom_role::{CustomRole, PermissionOverride};
use crate::models::grant::ShareGrant;
use crate::models::resource::Resource;
use crate::models::user::User;

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite default timestamp format, with optional fractional seconds.
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

fn get_string(row: &SqliteRow, column: &str) -> Result<String, AppError> {
    row.try_get(column)
        .map_err(|e| AppError::internal(format!("missing {}: {}", column, e)))
}

fn get_opt_string(row: &SqliteRow, column: &str) -> Result<Option<String>, AppError> {
    row.try_get(column)
        .map_err(|e| AppError::internal(format!("missing {}: {}", column, e)))
}

fn get_bool(row: &SqliteRow, column: &str) -> Result<bool, AppError> {
    row.try_get(column)
        .map_err(|e| AppError::internal(format!("missing {}: {}", column, e)))
}

fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s).map_err(|e| AppError::internal(format!("invalid uuid: {}", e)))
}

fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, AppError> {
    parse_uuid(&get_string(row, column)?)
}

fn get_opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>, AppError> {
    match get_opt_string(row, column)? {
        Some(s) => Ok(Some(parse_uuid(&s)?)),
        None => Ok(None),
    }
}

fn get_datetime(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, AppError> {
    parse_datetime(&get_string(row, column)?)
}

fn parse_org_role(s: &str) -> Result<OrgRole, AppError> {
    OrgRole::parse(s).ok_or_else(|| AppError::internal(format!("invalid org role: {}", s)))
}

pub fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
    Ok(User {
        id: get_uuid(row, "id")?,
        display_name: get_string(row, "display_name")?,
        org_role: parse_org_role(&get_string(row, "org_role")?)?,
        custom_role_id: get_opt_uuid(row, "custom_role_id")?,
        department_id: get_opt_uuid(row, "department_id")?,
        created_at: get_datetime(row, "created_at")?,
        updated_at: get_datetime(row, "updated_at")?,
    })
}

pub fn custom_role_from_row(row: &SqliteRow) -> Result<CustomRole, AppError> {
    Ok(CustomRole {
        id: get_uuid(row, "id")?,
        name: get_string(row, "name")?,
        description: get_opt_string(row, "description")?,
        base_role: parse_org_role(&get_string(row, "base_role")?)?,
        is_active: get_bool(row, "is_active")?,
        created_at: get_datetime(row, "created_at")?,
        updated_at: get_datetime(row, "updated_at")?,
    })
}

pub fn override_from_row(row: &SqliteRow) -> Result<PermissionOverride, AppError> {
    let permission_s = get_string(row, "permission")?;
    let permission = Permission::parse(&permission_s)
        .ok_or_else(|| AppError::internal(format!("unknown permission: {}", permission_s)))?;

    Ok(PermissionOverride {
        role_id: get_uuid(row, "role_id")?,
        permission,
        allowed: get_bool(row, "allowed")?,
        created_at: get_datetime(row, "created_at")?,
    })
}

pub fn resource_from_row(row: &SqliteRow) -> Result<Resource, AppError> {
    let type_s = get_string(row, "resource_type")?;
    let resource_type = ResourceType::parse(&type_s)
        .ok_or_else(|| AppError::internal(format!("unknown resource type: {}", type_s)))?;

    Ok(Resource {
        resource_type,
        id: get_uuid(row, "id")?,
        owner_id: get_uuid(row, "owner_id")?,
        department_id: get_opt_uuid(row, "department_id")?,
        is_transferred: get_bool(row, "is_transferred")?,
        transferred_to_id: get_opt_uuid(row, "transferred_to_id")?,
        created_at: get_datetime(row, "created_at")?,
        updated_at: get_datetime(row, "updated_at")?,
    })
}

pub fn grant_from_row(row: &SqliteRow) -> Result<ShareGrant, AppError> {
    let type_s = get_string(row, "resource_type")?;
    let resource_type = ResourceType::parse(&type_s)
        .ok_or_else(|| AppError::internal(format!("unknown resource type: {}", type_s)))?;
    let level_s = get_string(row, "access_level")?;
    let access_level = AccessLevel::parse(&level_s)
        .ok_or_else(|| AppError::internal(format!("unknown access level: {}", level_s)))?;

    Ok(ShareGrant {
        resource_type,
        resource_id: get_uuid(row, "resource_id")?,
        shared_with_id: get_uuid(row, "shared_with_id")?,
        access_level,
        note: get_opt_string(row, "note")?,
        created_at: get_datetime(row, "created_at")?,
    })
}

pub fn audit_entry_from_row(row: &SqliteRow) -> Result<AuditLogEntry, AppError> {
    let action_s = get_string(row, "action")?;
    let action = AuditAction::parse(&action_s)
        .ok_or_else(|| AppError::internal(format!("unknown audit action: {}", action_s)))?;

    let permission = match get_opt_string(row, "permission")? {
        Some(s) => Some(
            Permission::parse(&s)
                .ok_or_else(|| AppError::internal(format!("unknown permission: {}", s)))?,
        ),
        None => None,
    };

    let parse_json = |s: Option<String>| -> Result<Option<serde_json::Value>, AppError> {
        match s {
            Some(s) => serde_json::from_str(&s)
                .map(Some)
                .map_err(|e| AppError::internal(format!("invalid audit payload: {}", e))),
            None => Ok(None),
        }
    };

    Ok(AuditLogEntry {
        id: get_uuid(row, "id")?,
        entity_type: get_string(row, "entity_type")?,
        action,
        permission,
        old_value: parse_json(get_opt_string(row, "old_value")?)?,
        new_value: parse_json(get_opt_string(row, "new_value")?)?,
        actor_id: get_opt_uuid(row, "actor_id")?,
        subject_id: get_opt_uuid(row, "subject_id")?,
        prev_hash: get_opt_string(row, "prev_hash")?,
        hash: get_string(row, "hash")?,
        created_at: get_datetime(row, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_accepts_rfc3339_and_sqlite_formats() {
        assert!(parse_datetime("2025-11-19T12:34:56Z").is_ok());
        assert!(parse_datetime("2025-11-19T12:34:56.123+00:00").is_ok());
        assert!(parse_datetime("2025-11-19 12:34:56").is_ok());
        assert!(parse_datetime("2025-11-19 12:34:56.123").is_ok());
        assert!(parse_datetime("not-a-date").is_err());
    }
}
