// =====================================================================================
// File: core-database/src/lib.rs
// Description: Persistence layer for Rapid100 call records
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

pub mod migrations;
pub mod postgres;
pub mod repository;

pub use postgres::{create_pool, health_check};
pub use repository::{parse_status_strict, CallAnalytics, CallFilters, CallRepository};

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => {
                DatabaseError::Connection("Connection pool timed out".to_string())
            }
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    DatabaseError::ConstraintViolation(db_err.to_string())
                } else {
                    DatabaseError::Query(db_err.to_string())
                }
            }
            _ => DatabaseError::Query(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Serialization(err.to_string())
    }
}

impl DatabaseError {
    /// Transient errors are worth retrying with backoff; schema or
    /// constraint trouble is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, DatabaseError::Connection(_) | DatabaseError::Query(_))
    }
}
