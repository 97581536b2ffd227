//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (vending-core) ← What the engine understands               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError (vending-engine) ← Kind + message for the caller          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;
use vending_core::StoreError;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Registering a username that is taken
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Deleting a seller that still owns products
    /// - Inserting a product for a seller id that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative balance, non-positive price, ...).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// SQLite refused the write because another connection holds the lock
    /// or committed after this transaction's snapshot.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Compare-and-swap update matched no row at the expected version.
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: &'static str, id: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(entity: &'static str, id: impl Into<String>) -> Self {
        DbError::Conflict {
            entity,
            id: id.into(),
        }
    }
}

/// SQLite primary result codes that mean "someone else holds the lock".
///
/// Extended codes (e.g. 517 `SQLITE_BUSY_SNAPSHOT`) keep the primary code in
/// the low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_busy_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

/// `SQLITE_CONSTRAINT_FOREIGNKEY`, and `SQLITE_CONSTRAINT_TRIGGER` which is
/// what an `ON DELETE RESTRICT` action reports.
const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;
const SQLITE_CONSTRAINT_TRIGGER: i32 = 1811;

fn is_foreign_key_failure(code: Option<&str>, message: &str) -> bool {
    let by_code = code
        .and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c, SQLITE_CONSTRAINT_FOREIGNKEY | SQLITE_CONSTRAINT_TRIGGER))
        .unwrap_or(false);

    by_code || message.contains("FOREIGN KEY constraint failed")
}

/// Classifies sqlx failures.
///
/// ```text
/// RowNotFound                       → NotFound
/// Database, busy/locked code        → Busy
/// Database, FK code or message      → ForeignKeyViolation
/// Database, ErrorKind::Unique...    → UniqueViolation
/// Database, ErrorKind::ForeignKey.. → ForeignKeyViolation
/// Database, ErrorKind::Check...     → CheckViolation
/// PoolTimedOut                      → PoolExhausted
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let db_err = match err {
            sqlx::Error::RowNotFound => return DbError::not_found("row", "unknown"),
            sqlx::Error::PoolTimedOut => return DbError::PoolExhausted,
            sqlx::Error::PoolClosed => {
                return DbError::ConnectionFailed("pool is closed".to_string())
            }
            sqlx::Error::Database(db_err) => db_err,
            other => return DbError::Internal(other.to_string()),
        };

        let message = db_err.message().to_string();
        let code = db_err.code();

        if is_busy_code(code.as_deref()) || message.contains("database is locked") {
            return DbError::Busy(message);
        }

        if is_foreign_key_failure(code.as_deref(), &message) {
            return DbError::ForeignKeyViolation { message };
        }

        match db_err.kind() {
            // "UNIQUE constraint failed: accounts.username"
            ErrorKind::UniqueViolation => DbError::UniqueViolation {
                field: message
                    .rsplit(": ")
                    .next()
                    .unwrap_or("unknown")
                    .to_string(),
                value: "unknown".to_string(),
            },
            ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
            ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                DbError::CheckViolation { message }
            }
            _ => DbError::QueryFailed(message),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Folds database failures into the storage-agnostic outcomes.
///
/// ```text
/// NotFound                         → StoreError::NotFound
/// Unique / ForeignKey / Check      → StoreError::ConstraintViolation
/// Busy / Conflict                  → StoreError::Conflict (retryable)
/// PoolExhausted                    → StoreError::Timeout
/// everything else                  → StoreError::Backend
/// ```
impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => StoreError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => StoreError::ConstraintViolation {
                field,
                detail: format!("'{value}' already exists"),
            },
            DbError::ForeignKeyViolation { message } => StoreError::ConstraintViolation {
                field: "foreign key".to_string(),
                detail: message,
            },
            DbError::CheckViolation { message } => StoreError::ConstraintViolation {
                field: "check".to_string(),
                detail: message,
            },
            DbError::Busy(_) | DbError::Conflict { .. } => StoreError::Conflict,
            DbError::PoolExhausted => StoreError::Timeout,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_codes() {
        assert!(is_busy_code(Some("5")));
        assert!(is_busy_code(Some("517")));
        assert!(is_busy_code(Some("6")));
        assert!(!is_busy_code(Some("19")));
        assert!(!is_busy_code(Some("2067")));
        assert!(!is_busy_code(None));
    }

    #[test]
    fn test_foreign_key_failures() {
        assert!(is_foreign_key_failure(Some("787"), "whatever"));
        assert!(is_foreign_key_failure(Some("1811"), "whatever"));
        assert!(is_foreign_key_failure(None, "FOREIGN KEY constraint failed"));
        assert!(!is_foreign_key_failure(Some("2067"), "UNIQUE constraint failed: accounts.username"));
        assert!(!is_foreign_key_failure(None, "no such table: accounts"));
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            StoreError::from(DbError::duplicate("username", "alice")),
            StoreError::ConstraintViolation { .. }
        ));
        assert!(matches!(
            StoreError::from(DbError::Busy("locked".to_string())),
            StoreError::Conflict
        ));
        assert!(matches!(
            StoreError::from(DbError::conflict("account", "a-1")),
            StoreError::Conflict
        ));
        assert!(matches!(
            StoreError::from(DbError::not_found("product", "p-1")),
            StoreError::NotFound { entity: "product", .. }
        ));
        assert!(matches!(
            StoreError::from(DbError::ForeignKeyViolation {
                message: "FOREIGN KEY constraint failed".to_string()
            }),
            StoreError::ConstraintViolation { .. }
        ));
        assert!(matches!(
            StoreError::from(DbError::PoolExhausted),
            StoreError::Timeout
        ));
    }
}
