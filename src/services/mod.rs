//! Business logic services for the vault.

pub mod config_bridge;
pub mod encryption;
pub mod vault;

pub use config_bridge::{ConfigBridge, ConfigSource, ResolvedConfig, SecretMapping};
pub use encryption::VaultEncryption;
pub use vault::{SecretVault, StoreSecretRequest, UpdateSecretRequest};
