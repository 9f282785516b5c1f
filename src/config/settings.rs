//! # Configuration Settings
//!
//! Defines the configuration structure for the vault core.

use crate::errors::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Vault configuration
    pub vault: VaultConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from `SECUREVAULT_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("SECUREVAULT_DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(value) = std::env::var("SECUREVAULT_DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = value
                .parse()
                .map_err(|e| VaultError::config(format!("Invalid max connections: {}", e)))?;
        }
        if let Ok(value) = std::env::var("SECUREVAULT_DATABASE_AUTO_MIGRATE") {
            config.database.auto_migrate = value
                .parse()
                .map_err(|e| VaultError::config(format!("Invalid auto_migrate flag: {}", e)))?;
        }
        if let Ok(key) = std::env::var("SECUREVAULT_MASTER_KEY") {
            config.vault.master_key = Some(key);
        }
        if let Ok(level) = std::env::var("SECUREVAULT_LOG_LEVEL") {
            config.observability.log_level = level;
        }
        if let Ok(value) = std::env::var("SECUREVAULT_LOG_JSON") {
            config.observability.json_logs = value
                .parse()
                .map_err(|e| VaultError::config(format!("Invalid log JSON flag: {}", e)))?;
        }

        config.validate_all()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate_all(&self) -> Result<()> {
        Validate::validate(self).map_err(VaultError::from)?;
        self.validate_custom()
    }

    /// Custom validation logic that goes beyond what the validator crate can do
    fn validate_custom(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite://") {
            return Err(VaultError::validation("Database URL must start with 'sqlite://'"));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(VaultError::validation(
                "min_connections cannot be greater than max_connections",
            ));
        }

        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(max = 50, message = "Min connections must be at most 50"))]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub connect_timeout_seconds: u64,

    /// Idle connection timeout in seconds (None = no timeout)
    pub idle_timeout_seconds: Option<u64>,

    /// Run schema migrations automatically when the pool is created
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/securevault.db".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Whether the configured database is SQLite
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite://")
    }

    /// Get connection acquire timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_seconds.map(Duration::from_secs)
    }
}

/// Vault configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VaultConfig {
    /// Master encryption key. Strength requirements (non-empty, at least 32
    /// characters) are enforced by the encryption engine at construction.
    #[serde(skip_serializing)]
    pub master_key: Option<String>,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level filter (tracing EnvFilter syntax)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Emit logs as JSON instead of human-readable text
    pub json_logs: bool,

    /// Service name attached to log output
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            service_name: "securevault".to_string(),
        }
    }
}
