//! jobharvest Store Layer
//!
//! Provides `SQLite` key/value persistence via `SQLx` with embedded migrations,
//! and the capped [`ResultBuffer`] that keeps scraped jobs across restarts.
//!
//! # Example
//!
//! ```ignore
//! use jobharvest_store::{Database, ResultBuffer, SqliteStore};
//!
//! let db = Database::new("jobharvest.db").await?;
//! db.run_migrations().await?;
//! let buffer = ResultBuffer::new(SqliteStore::new(db.pool().clone()), 1000);
//! buffer.append(&jobs).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod buffer;
pub mod connection;
pub mod error;
pub mod kv;
pub mod migrations;
pub mod settings;

// Re-export commonly used types
pub use buffer::{AppendOutcome, ResultBuffer, DEFAULT_CAP, JOBS_KEY, LAST_RUN_KEY};
pub use error::{Result, StoreError};
pub use kv::{KvStore, MemoryStore, SqliteStore};

use std::path::Path;

/// High-level database handle.
#[derive(Debug, Clone)]
pub struct Database {
    pool: sqlx::SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `path`.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path).await?;
        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::new(":memory:").await
    }

    /// Run all pending database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    /// Result buffer backed by this database.
    #[must_use]
    pub fn result_buffer(&self, cap: usize) -> ResultBuffer<SqliteStore> {
        ResultBuffer::new(SqliteStore::new(self.pool.clone()), cap)
    }

    /// Close the connection pool gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
