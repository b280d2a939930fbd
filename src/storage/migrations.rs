//! # Database Migration Management
//!
//! Handles database schema evolution using embedded SQL migrations. The
//! migration files are compiled into the binary and executed automatically on
//! startup when `auto_migrate` is enabled; each migration runs inside its own
//! transaction and is recorded in a tracking table.

use crate::errors::{Error, Result};
use crate::storage::DbPool;
use sqlx::Row;
use tracing::{error, info};

/// Embedded migrations in execution order. Versions are timestamps so new
/// migrations always sort after applied ones.
const MIGRATIONS: &[(i64, &str, &str)] = &[
    (
        20250301000001,
        "create_users_table",
        include_str!("../../migrations/20250301000001_create_users_table.sql"),
    ),
    (
        20250301000002,
        "create_news_table",
        include_str!("../../migrations/20250301000002_create_news_table.sql"),
    ),
    (
        20250301000003,
        "create_exchanges_table",
        include_str!("../../migrations/20250301000003_create_exchanges_table.sql"),
    ),
    (
        20250301000004,
        "create_crypto_coins_table",
        include_str!("../../migrations/20250301000004_create_crypto_coins_table.sql"),
    ),
];

/// Run all pending database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    create_migration_table(pool).await?;

    let applied = applied_versions(pool).await?;

    let mut migrations_run = 0;
    for (version, description, sql) in MIGRATIONS {
        if applied.contains(version) {
            continue;
        }

        info!(version = version, "Running migration: {}", description);

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| Error::database(e, "Failed to start migration transaction"))?;

        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| {
            error!(error = %e, migration = description, "Migration failed");
            Error::database(e, format!("Migration failed: {}", description))
        })?;

        sqlx::query(
            "INSERT INTO _optfin_migrations (version, description, installed_on) VALUES ($1, $2, $3)",
        )
        .bind(version)
        .bind(description)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::database(e, format!("Failed to record migration: {}", description)))?;

        tx.commit()
            .await
            .map_err(|e| Error::database(e, "Failed to commit migration transaction"))?;

        migrations_run += 1;
    }

    if migrations_run > 0 {
        info!(count = migrations_run, "Database migrations completed");
    } else {
        info!("No pending migrations");
    }

    Ok(())
}

/// Create the migration tracking table
async fn create_migration_table(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _optfin_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL,
            installed_on TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| Error::database(e, "Failed to create migration tracking table"))?;

    Ok(())
}

/// Get list of applied migration versions
async fn applied_versions(pool: &DbPool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT version FROM _optfin_migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .map_err(|e| Error::database(e, "Failed to get applied migrations"))?;

    Ok(rows.into_iter().map(|row| row.get::<i64, _>("version")).collect())
}

/// Get the current migration version (highest applied)
pub async fn migration_version(pool: &DbPool) -> Result<i64> {
    let applied = applied_versions(pool).await?;
    Ok(applied.into_iter().max().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> DbPool {
        SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn migrations_apply_cleanly() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();

        let version = migration_version(&pool).await.unwrap();
        assert_eq!(version, MIGRATIONS.last().unwrap().0);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _optfin_migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn schema_enforces_unique_login() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();

        let insert = "INSERT INTO users (id, login, email, password_hash, role, is_active, profile, created_at, updated_at) VALUES ($1, $2, $3, 'h', 'user', 1, '{}', $4, $4)";
        sqlx::query(insert)
            .bind("id-1")
            .bind("alice")
            .bind("a@x.com")
            .bind(chrono::Utc::now())
            .execute(&pool)
            .await
            .unwrap();

        let duplicate = sqlx::query(insert)
            .bind("id-2")
            .bind("alice")
            .bind("b@x.com")
            .bind(chrono::Utc::now())
            .execute(&pool)
            .await;
        assert!(duplicate.is_err());
    }
}
