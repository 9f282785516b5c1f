//! Error handling for the vault core.

pub mod types;

pub use types::{Result, VaultError};
