//! # Storage and Persistence
//!
//! Database connectivity and the persistence layer for secrets and their
//! audit trail.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use crate::config::DatabaseConfig;

pub use migrations::{list_applied_migrations, run_migrations, MigrationInfo};
pub use pool::{create_pool, get_pool_stats, DbPool, PoolStats};
pub use repositories::{
    AuditLogRepository, AuditQuery, AuditRecord, NewAuditRecord, SecretMetadata, SecretRecord,
    SecretRepository, SecretSummary,
};

use crate::errors::{Result, VaultError};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| VaultError::Database {
        source: e,
        context: "Database connectivity check failed".to_string(),
    })?;

    Ok(())
}
