//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`KeyNotFound`] thrown when a referenced member, item, purchase or link
//!   does not exist.
//! - [`ExistingKey`] thrown when a uniqueness rule would be broken (duplicate
//!   email, item already linked to a purchase, second pending link).
//! - [`Conflict`] thrown when a row changed under a concurrent write.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`Conflict`]: EngineError::Conflict
use sea_orm::{DbErr, RuntimeErr, sqlx};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Id mismatch: {0}")]
    IdMismatch(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// SQLite primary result codes for a lock held by another connection.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl EngineError {
    /// True when the store refused a statement because another connection
    /// holds a conflicting lock (`SQLITE_BUSY`/`SQLITE_LOCKED` and their
    /// extended codes).
    pub(crate) fn is_busy(&self) -> bool {
        let Self::Database(
            DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Database(err)))
            | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(err)))
            | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(err))),
        ) = self
        else {
            return false;
        };
        err.code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::IdMismatch(a), Self::IdMismatch(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lock_errors_are_busy() {
        assert!(!EngineError::Conflict("member".to_string()).is_busy());
        assert!(!EngineError::Database(DbErr::Custom("database is locked".to_string())).is_busy());
        assert!(
            !EngineError::Database(DbErr::Exec(RuntimeErr::Internal("busy".to_string())))
                .is_busy()
        );
    }
}
