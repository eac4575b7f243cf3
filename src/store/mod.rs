//! Persistence layer. One module per aggregate; every state-changing
//! operation writes its audit entry inside the same transaction, so a
//! permission never changes without a matching audit row and vice versa.
//!
//! Both the HTTP surface and the operator CLI go through these functions.

pub mod audit;
pub mod grants;
pub mod resources;
pub mod roles;
pub mod users;

use crate::errors::AppError;

/// Map a unique-constraint violation to `Conflict`; pass everything else
/// through as a database error.
pub(crate) fn map_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db)
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
        {
            AppError::conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}
