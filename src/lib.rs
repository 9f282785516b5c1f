//! # SecureVault
//!
//! Embeddable secret management with envelope encryption, a tamper-evident
//! audit trail, and a bridge from vault-backed secrets into application
//! configuration.
//!
//! ## Architecture
//!
//! The crate is layered:
//!
//! ```text
//! SecretVault / ConfigBridge → Encryption Engine
//!            ↓                        ↓
//!    Persistence Layer (SQLx)   ring (PBKDF2 + AES-256-GCM)
//! ```
//!
//! ## Core Components
//!
//! - **SecretVault**: lifecycle operations over encrypted secrets, each one
//!   committed atomically with its audit entry
//! - **VaultEncryption**: per-value envelope encryption with a key derived
//!   from the master key and a fresh salt on every call
//! - **ConfigBridge**: resolves configuration keys from vault secrets with
//!   fallback to overrides and defaults
//! - **Persistence Layer**: SQLx with SQLite for secrets and the append-only
//!   audit log
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use securevault::{
//!     create_pool, ActorContext, AppConfig, Result, SecretVault, StoreSecretRequest,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let pool = create_pool(&config.database).await?;
//!     let vault = SecretVault::new(pool, "a-master-key-of-at-least-32-characters")?;
//!
//!     let actor = ActorContext::default();
//!     vault
//!         .store(StoreSecretRequest::new("db_password", "hunter2"), &actor)
//!         .await?;
//!     let value = vault.retrieve("db_password", &actor).await?;
//!     assert_eq!(value, "hunter2");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod services;
pub mod storage;

// Re-export commonly used types and traits
pub use config::{AppConfig, DatabaseConfig, ObservabilityConfig, VaultConfig};
pub use domain::{ActorContext, AuditAction, AuditDetails, BULK_SECRET_NAME};
pub use errors::{Result, VaultError};
pub use observability::init_tracing;
pub use services::{
    ConfigBridge, ConfigSource, ResolvedConfig, SecretMapping, SecretVault, StoreSecretRequest,
    UpdateSecretRequest, VaultEncryption,
};
pub use storage::{
    create_pool, AuditQuery, AuditRecord, DbPool, SecretRecord, SecretSummary,
};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
