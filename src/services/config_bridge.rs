//! Configuration bridge
//!
//! Resolves application configuration keys from vault-backed secrets with
//! explicit fallback to caller-supplied overrides and static defaults.
//! Resolution returns a [`ResolvedConfig`] value; nothing is cached in
//! process-global state, so callers decide the lifetime of resolved
//! configuration themselves.

use crate::domain::ActorContext;
use crate::errors::{Result, VaultError};
use crate::services::vault::{SecretVault, StoreSecretRequest};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Declarative link between a configuration key and its vault secret
#[derive(Debug, Clone)]
pub struct SecretMapping {
    /// Configuration key the application looks up
    pub config_key: String,
    /// Vault secret name backing the key
    pub secret_name: String,
    /// Fallback when neither the vault nor overrides supply a value
    pub default_value: Option<String>,
    /// Required keys with no value from any source fail resolution
    pub required: bool,
    pub description: Option<String>,
}

impl SecretMapping {
    pub fn new(config_key: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            config_key: config_key.into(),
            secret_name: secret_name.into(),
            default_value: None,
            required: false,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Where a resolved configuration value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Vault,
    Override,
    Default,
}

/// Outcome of one resolution pass over the mapping table
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedConfig {
    values: HashMap<String, String>,
    sources: HashMap<String, ConfigSource>,
}

impl ResolvedConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Where `key` was resolved from, if it resolved at all
    pub fn source(&self, key: &str) -> Option<ConfigSource> {
        self.sources.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, key: &str, value: String, source: ConfigSource) {
        self.values.insert(key.to_string(), value);
        self.sources.insert(key.to_string(), source);
    }
}

/// Bridges vault secrets into application configuration
#[derive(Debug, Clone)]
pub struct ConfigBridge {
    mappings: Vec<SecretMapping>,
}

impl ConfigBridge {
    pub fn new(mappings: Vec<SecretMapping>) -> Self {
        Self { mappings }
    }

    /// The mapping table for the standard application keys
    pub fn with_default_mappings() -> Self {
        Self::new(vec![
            SecretMapping::new("database_password", "db_password")
                .required()
                .with_description("Primary database password"),
            SecretMapping::new("database_user", "db_user")
                .with_default("app")
                .with_description("Primary database user"),
            SecretMapping::new("cache_password", "cache_password")
                .with_description("Cache server password, unset for open instances"),
            SecretMapping::new("jwt_signing_key", "jwt_signing_key")
                .required()
                .with_description("Key for signing session tokens"),
            SecretMapping::new("app_secret_key", "app_secret_key")
                .required()
                .with_description("Application-wide secret key"),
            SecretMapping::new("smtp_password", "smtp_password")
                .with_description("Outbound mail password"),
        ])
    }

    pub fn mappings(&self) -> &[SecretMapping] {
        &self.mappings
    }

    /// Resolve every mapped key. Per key the precedence is vault secret,
    /// then override, then default.
    ///
    /// A vault read failure for one key degrades that key to the next
    /// source instead of failing the pass. Required keys that resolve from
    /// no source are collected and reported together in a single error.
    #[instrument(skip_all, fields(mapping_count = self.mappings.len()), name = "config_resolve")]
    pub async fn resolve(
        &self,
        vault: Option<&SecretVault>,
        overrides: &HashMap<String, String>,
    ) -> Result<ResolvedConfig> {
        let actor = ActorContext::system();
        let mut resolved = ResolvedConfig::default();
        let mut missing_required = Vec::new();

        for mapping in &self.mappings {
            if let Some(vault) = vault {
                match vault.retrieve(&mapping.secret_name, &actor).await {
                    Ok(value) => {
                        resolved.insert(&mapping.config_key, value, ConfigSource::Vault);
                        continue;
                    }
                    Err(VaultError::NotFound { .. }) => {
                        debug!(
                            config_key = %mapping.config_key,
                            secret_name = %mapping.secret_name,
                            "Secret not in vault, falling back"
                        );
                    }
                    Err(error) => {
                        warn!(
                            config_key = %mapping.config_key,
                            secret_name = %mapping.secret_name,
                            error = %error,
                            "Vault lookup failed, falling back"
                        );
                    }
                }
            }

            if let Some(value) = overrides.get(&mapping.config_key) {
                resolved.insert(&mapping.config_key, value.clone(), ConfigSource::Override);
            } else if let Some(default) = &mapping.default_value {
                resolved.insert(&mapping.config_key, default.clone(), ConfigSource::Default);
            } else if mapping.required {
                missing_required.push(mapping.config_key.clone());
            }
        }

        if !missing_required.is_empty() {
            return Err(VaultError::config(format!(
                "Missing required configuration keys: {}",
                missing_required.join(", ")
            )));
        }

        Ok(resolved)
    }

    /// Seed the vault with mapped secrets from externally supplied
    /// overrides. Static defaults are never migrated; freezing a
    /// code-level default into the vault would shadow later changes to it.
    ///
    /// Idempotent: secrets that already exist in the vault are skipped, so
    /// a re-run after partial failure completes the remainder. Returns the
    /// config keys whose secrets were newly stored.
    #[instrument(skip_all, name = "config_migrate")]
    pub async fn migrate(
        &self,
        vault: &SecretVault,
        overrides: &HashMap<String, String>,
    ) -> Result<Vec<String>> {
        let actor = ActorContext::system();
        let mut migrated = Vec::new();

        for mapping in &self.mappings {
            let Some(value) = overrides.get(&mapping.config_key) else {
                debug!(config_key = %mapping.config_key, "No override value to migrate, skipping");
                continue;
            };

            let mut request = StoreSecretRequest::new(&mapping.secret_name, value);
            if let Some(description) = &mapping.description {
                request = request.with_description(description.clone());
            }

            match vault.store(request, &actor).await {
                Ok(_) => {
                    info!(
                        config_key = %mapping.config_key,
                        secret_name = %mapping.secret_name,
                        "Migrated configuration value into vault"
                    );
                    migrated.push(mapping.config_key.clone());
                }
                // An existing secret wins; re-runs must not clobber it
                Err(VaultError::Validation { .. }) => {
                    debug!(
                        config_key = %mapping.config_key,
                        secret_name = %mapping.secret_name,
                        "Secret already in vault, skipping"
                    );
                }
                Err(error) => return Err(error),
            }
        }

        Ok(migrated)
    }
}
