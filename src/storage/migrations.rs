//! # Database Migration Management
//!
//! Schema evolution using SQL migrations embedded in the binary, executed
//! automatically on pool creation when `auto_migrate` is enabled. Applied
//! versions are tracked in a `schema_migrations` table so reruns are no-ops.

use crate::errors::{Result, VaultError};
use crate::storage::DbPool;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use tracing::{debug, info};

/// Embedded migrations, ordered by version prefix.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_create_vault_tables",
    include_str!("../../migrations/0001_create_vault_tables.sql"),
)];

/// Information about an applied migration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationInfo {
    pub version: String,
    pub applied_at: chrono::DateTime<chrono::Utc>,
}

/// Run all pending migrations against the given pool
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    ensure_tracking_table(pool).await?;

    let applied = applied_versions(pool).await?;
    let mut applied_count = 0usize;

    for (version, sql) in MIGRATIONS {
        if applied.iter().any(|v| v == version) {
            debug!(version, "Migration already applied, skipping");
            continue;
        }

        let mut tx = pool.begin().await.map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to begin transaction for migration '{}'", version),
        })?;

        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to apply migration '{}'", version),
        })?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES ($1, $2)")
            .bind(version)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| VaultError::Database {
                source: e,
                context: format!("Failed to record migration '{}'", version),
            })?;

        tx.commit().await.map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to commit migration '{}'", version),
        })?;

        info!(version, "Applied database migration");
        applied_count += 1;
    }

    if applied_count == 0 {
        debug!("Database schema is up to date");
    }

    Ok(())
}

/// List all applied migrations, oldest first
pub async fn list_applied_migrations(pool: &DbPool) -> Result<Vec<MigrationInfo>> {
    ensure_tracking_table(pool).await?;

    let rows = sqlx::query(
        "SELECT version, applied_at FROM schema_migrations ORDER BY version ASC",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| VaultError::Database {
        source: e,
        context: "Failed to list applied migrations".to_string(),
    })?;

    rows.into_iter()
        .map(|row| {
            Ok(MigrationInfo { version: row.try_get("version")?, applied_at: row.try_get("applied_at")? })
        })
        .collect()
}

async fn ensure_tracking_table(pool: &DbPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
             version TEXT PRIMARY KEY,
             applied_at TEXT NOT NULL
         )",
    )
    .execute(pool)
    .await
    .map_err(|e| VaultError::Database {
        source: e,
        context: "Failed to create schema_migrations table".to_string(),
    })?;

    Ok(())
}

async fn applied_versions(pool: &DbPool) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT version FROM schema_migrations ORDER BY version ASC")
        .fetch_all(pool)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: "Failed to read applied migrations".to_string(),
        })?;

    rows.into_iter().map(|row| Ok(row.try_get::<String, _>("version")?)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::storage::create_pool;

    async fn memory_pool() -> DbPool {
        let config = DatabaseConfig {
            url: "sqlite://:memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            auto_migrate: false,
            ..Default::default()
        };
        create_pool(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_run_migrations_creates_tables() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();

        // Both vault tables must exist afterwards
        sqlx::query("SELECT COUNT(*) FROM secrets").fetch_one(&pool).await.unwrap();
        sqlx::query("SELECT COUNT(*) FROM secret_audit_log").fetch_one(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let applied = list_applied_migrations(&pool).await.unwrap();
        assert_eq!(applied.len(), MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_list_applied_migrations_empty() {
        let pool = memory_pool().await;
        let applied = list_applied_migrations(&pool).await.unwrap();
        assert!(applied.is_empty());
    }
}
