//! Embedded schema migrations.
//!
//! Numbered SQL steps compiled into the binary and applied in order on
//! startup; `schema_migrations` records what already ran, so re-running is
//! a no-op.

use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};

/// `(version, description, sql)`, ascending. New steps append; shipped
/// steps never change.
const MIGRATIONS: &[(i64, &str, &str)] = &[(
    1,
    "initial schema",
    include_str!("../../../migrations/001_initial_schema.sql"),
)];

/// Bring the store up to the current schema. Returns how many steps ran.
pub async fn migrate(pool: &SqlitePool) -> DomainResult<usize> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL DEFAULT '',
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await?;

    let current = schema_version(pool).await?;

    let mut applied = 0;
    for (version, description, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        sqlx::raw_sql(sql).execute(pool).await.map_err(|e| {
            DomainError::DatabaseError(format!("apply migration {version} ({description}): {e}"))
        })?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(version)
            .bind(description)
            .execute(pool)
            .await?;
        tracing::info!(version, description, "schema migration applied");
        applied += 1;
    }

    Ok(applied)
}

/// Highest applied migration version, 0 for a fresh store.
pub async fn schema_version(pool: &SqlitePool) -> DomainResult<i64> {
    let (version,): (i64,) =
        sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(pool)
            .await?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::connection::open_test_store;

    #[tokio::test]
    async fn test_migrate_fresh_store() {
        let pool = open_test_store().await.unwrap();
        let applied = migrate(&pool).await.unwrap();
        assert_eq!(applied, MIGRATIONS.len());
        assert_eq!(schema_version(&pool).await.unwrap(), MIGRATIONS.last().unwrap().0);

        // The schema is in place: the config singleton is insertable.
        sqlx::query("INSERT INTO config (id) VALUES (1)").execute(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let pool = open_test_store().await.unwrap();
        migrate(&pool).await.unwrap();
        assert_eq!(migrate(&pool).await.unwrap(), 0);
    }
}
