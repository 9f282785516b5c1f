//! Shared utilities for integration tests.
//!
//! Provides file-based SQLite databases in a per-test temporary directory so
//! every test gets an isolated schema with migrations applied.

#![allow(dead_code)]

use securevault::storage::{create_pool, DbPool};
use securevault::DatabaseConfig;
use tempfile::TempDir;

/// Master key used by the integration tests. Long enough to pass vault
/// construction validation.
pub const TEST_MASTER_KEY: &str = "integration-test-master-key-0123456789abcdef";

/// A second valid master key, distinct from [`TEST_MASTER_KEY`], for tests
/// that exercise cross-key behavior.
pub const OTHER_MASTER_KEY: &str = "alternate-test-master-key-fedcba9876543210";

/// A test database that lives in a temporary directory and is removed when
/// dropped.
pub struct TestDatabase {
    pub pool: DbPool,
    _dir: TempDir,
}

impl TestDatabase {
    /// Create a fresh database with migrations applied.
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir for test database");
        let db_path = dir.path().join("vault.db");

        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 5,
            min_connections: 1,
            auto_migrate: true,
            ..Default::default()
        };

        let pool = create_pool(&config).await.expect("create test database pool");
        Self { pool, _dir: dir }
    }
}
