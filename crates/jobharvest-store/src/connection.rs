//! Database connection management.
//!
//! Opens a plain `SQLite` pool through `SQLx`. Buffered results are a cache
//! of public postings, so the file is not encrypted.

use crate::error::{Result, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

const IN_MEMORY: &str = ":memory:";

/// Open a connection pool for the database at `path`.
///
/// `:memory:` opens a private in-memory database. Every pooled connection
/// to `:memory:` would see its own empty database, so that pool is limited
/// to a single connection.
///
/// # Errors
/// Returns `StoreError::Open` if the path is not valid UTF-8 or the database
/// cannot be created.
pub async fn open_pool(path: impl AsRef<Path>) -> Result<Pool<Sqlite>> {
    let path_str = path
        .as_ref()
        .to_str()
        .ok_or_else(|| StoreError::Open("invalid database path: not valid UTF-8".to_string()))?;

    let connect_options = SqliteConnectOptions::from_str(path_str)
        .map_err(|e| StoreError::Open(format!("invalid connection string: {e}")))?
        .create_if_missing(true);

    let max_connections = if path_str == IN_MEMORY { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_options)
        .await
        .map_err(|e| StoreError::Open(format!("failed to initialize pool: {e}")))?;

    tracing::info!("Database pool created at {}", path_str);
    Ok(pool)
}

/// Verify the database answers queries.
pub async fn ping(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_pool() {
        let pool = open_pool(IN_MEMORY).await.expect("open pool");
        ping(&pool).await.expect("ping");
        pool.close().await;
    }

    #[tokio::test]
    async fn test_file_pool_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jobs.db");
        let pool = open_pool(&path).await.expect("open pool");
        ping(&pool).await.expect("ping");
        assert!(path.exists());
    }
}
