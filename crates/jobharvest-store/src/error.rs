//! Store error types.

use jobharvest_core::HarvestError;
use thiserror::Error;

/// `SQLite` result code for a full database or disk.
const SQLITE_FULL: &str = "13";

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open or create the database.
    #[error("failed to open database: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// The backing store refused the write for lack of space.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(SQLITE_FULL) {
                return StoreError::QuotaExceeded;
            }
        }
        StoreError::Sqlx(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationError(err.to_string())
    }
}

impl From<StoreError> for HarvestError {
    fn from(err: StoreError) -> Self {
        HarvestError::Store(err.to_string())
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
