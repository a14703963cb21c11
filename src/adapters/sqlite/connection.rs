//! Opening the SQLite store.
//!
//! The store is a single WAL-mode database file; the scheduler re-reads
//! state from it instead of caching, so the pool stays small and the busy
//! timeout generous.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};

/// Open the store at `path`, creating the file and its directory on first
/// run. Fails here, at startup, rather than on the first scheduler tick.
pub async fn open_store(path: &str, max_connections: u32) -> DomainResult<SqlitePool> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DomainError::DatabaseError(format!(
                    "create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await?;

    probe(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory store for tests.
pub async fn open_test_store() -> DomainResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .shared_cache(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    probe(&pool).await?;
    Ok(pool)
}

async fn probe(pool: &SqlitePool) -> DomainResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_test_store_is_usable() {
        let pool = open_test_store().await.unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (id) VALUES (1)").execute(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_open_store_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/steward.db");
        let pool = open_store(path.to_str().unwrap(), 2).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();
        assert!(path.exists());
    }
}
