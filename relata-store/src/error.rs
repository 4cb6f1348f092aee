use rusqlite::{ffi, ErrorCode};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Missing required field: {entity}.{field}")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("Foreign key violation: {0}")]
    ForeignKey(String),

    #[error("Delete restricted: {0}")]
    Restricted(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl StoreError {
    /// True for every error that aborts an operation because the data broke a rule
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict(_)
                | StoreError::MissingField { .. }
                | StoreError::ForeignKey(_)
                | StoreError::Restricted(_)
                | StoreError::Constraint(_)
        )
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
                let detail = msg.clone().unwrap_or_else(|| e.to_string());
                match e.extended_code {
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => StoreError::ForeignKey(detail),
                    // ON DELETE RESTRICT is enforced as a trigger
                    ffi::SQLITE_CONSTRAINT_TRIGGER if detail.contains("FOREIGN KEY") => {
                        StoreError::ForeignKey(detail)
                    }
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        StoreError::Conflict(detail)
                    }
                    _ => StoreError::Constraint(detail),
                }
            }
            rusqlite::Error::FromSqlConversionFailure(..) => StoreError::InvalidData(err.to_string()),
            _ => StoreError::Sqlite(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn constraint_error(sql: &str) -> StoreError {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
             CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id));
             CREATE TABLE pinned (id INTEGER PRIMARY KEY,
                 parent_id INTEGER NOT NULL REFERENCES parent(id) ON DELETE RESTRICT);
             INSERT INTO parent (id, name) VALUES (1, 'a');
             INSERT INTO parent (id, name) VALUES (2, 'b');
             INSERT INTO pinned (parent_id) VALUES (2);",
        )
        .unwrap();
        conn.execute(sql, []).unwrap_err().into()
    }

    #[test]
    fn test_unique_violation_is_conflict() {
        let err = constraint_error("INSERT INTO parent (name) VALUES ('a')");
        assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_foreign_key_violation() {
        let err = constraint_error("INSERT INTO child (parent_id) VALUES (42)");
        assert!(matches!(err, StoreError::ForeignKey(_)), "got {err:?}");
    }

    #[test]
    fn test_restricted_delete_is_foreign_key() {
        let err = constraint_error("DELETE FROM parent WHERE id = 2");
        assert!(matches!(err, StoreError::ForeignKey(_)), "got {err:?}");
    }

    #[test]
    fn test_not_null_is_generic_constraint() {
        let err = constraint_error("INSERT INTO parent (name) VALUES (NULL)");
        assert!(matches!(err, StoreError::Constraint(_)), "got {err:?}");
    }

    #[test]
    fn test_syntax_error_is_storage_error() {
        let err = constraint_error("INSERT INTO nowhere VALUES (1)");
        assert!(matches!(err, StoreError::Sqlite(_)));
        assert!(!err.is_constraint_violation());
    }
}
