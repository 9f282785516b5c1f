//! # Configuration Management
//!
//! Environment-driven configuration for the vault core.

pub mod settings;

pub use settings::{AppConfig, DatabaseConfig, ObservabilityConfig, VaultConfig};
