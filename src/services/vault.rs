//! Secret vault service
//!
//! Orchestrates secret lifecycle operations (store, retrieve, update,
//! rotate, delete, list) on top of the encryption engine and the audit
//! trail. Every operation opens one transaction against the storage layer;
//! a secret mutation and its audit record commit or roll back together.
//!
//! Failed attempts (missing secret, name collision, bad input) are audited
//! too: their audit entry is committed in its own transaction before the
//! error is returned, so failed lookups are guaranteed to appear in the
//! trail. If that best-effort insert itself fails, the failure is logged
//! and the caller still receives the original operation error.

use crate::domain::{ActorContext, AuditDetails, SecretId, BULK_SECRET_NAME};
use crate::errors::{Result, VaultError};
use crate::services::encryption::VaultEncryption;
use crate::storage::repositories::{
    AuditLogRepository, AuditQuery, AuditRecord, NewAuditRecord, SecretRecord, SecretRepository,
    SecretSummary,
};
use crate::storage::DbPool;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tracing::{info, instrument, warn};

/// Request to store a new secret
#[derive(Debug, Clone)]
pub struct StoreSecretRequest {
    pub name: String,
    pub value: String,
    pub description: Option<String>,
    pub rotation_policy: Option<serde_json::Value>,
}

impl StoreSecretRequest {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), description: None, rotation_policy: None }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_rotation_policy(mut self, policy: serde_json::Value) -> Self {
        self.rotation_policy = Some(policy);
        self
    }
}

/// Request to update an existing secret. Description and rotation policy
/// are only overwritten when provided.
#[derive(Debug, Clone)]
pub struct UpdateSecretRequest {
    pub value: String,
    pub description: Option<String>,
    pub rotation_policy: Option<serde_json::Value>,
}

impl UpdateSecretRequest {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), description: None, rotation_policy: None }
    }
}

/// Core secret management service
#[derive(Debug, Clone)]
pub struct SecretVault {
    pool: DbPool,
    encryption: VaultEncryption,
}

impl SecretVault {
    /// Create a vault with the given master key.
    ///
    /// The encryption engine is initialized once and reused for all
    /// operations; an empty or too-short master key is a construction
    /// error.
    pub fn new(pool: DbPool, master_key: &str) -> Result<Self> {
        let encryption = VaultEncryption::new(master_key)?;
        Ok(Self::with_encryption(pool, encryption))
    }

    /// Create a vault from a pre-built encryption engine
    pub fn with_encryption(pool: DbPool, encryption: VaultEncryption) -> Self {
        Self { pool, encryption }
    }

    /// Fingerprint of the master key this vault encrypts with
    pub fn key_fingerprint(&self) -> &str {
        self.encryption.fingerprint()
    }

    /// Store a new secret under a unique name.
    ///
    /// The name pre-check is advisory; a concurrent insert racing past it
    /// is caught by the storage uniqueness constraint and surfaces as the
    /// same validation error.
    #[instrument(skip(self, request, actor), fields(secret_name = %request.name), name = "vault_store")]
    pub async fn store(
        &self,
        request: StoreSecretRequest,
        actor: &ActorContext,
    ) -> Result<SecretRecord> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            let error = VaultError::validation_field("Secret name cannot be empty", "name");
            self.audit_failure(&name, AuditDetails::WriteFailed { error: error.to_string() }, actor)
                .await;
            return Err(error);
        }
        if request.value.is_empty() {
            let error = VaultError::validation_field("Secret value cannot be empty", "value");
            self.audit_failure(&name, AuditDetails::WriteFailed { error: error.to_string() }, actor)
                .await;
            return Err(error);
        }

        let encrypted_value = self.encryption.encrypt(&request.value)?;
        let now = Utc::now();
        let record = SecretRecord {
            id: SecretId::new(),
            name: name.clone(),
            encrypted_value,
            description: request.description,
            rotation_policy: request.rotation_policy,
            access_count: 0,
            last_accessed_at: None,
            key_fingerprint: self.encryption.fingerprint().to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.begin().await?;

        if SecretRepository::find_by_name(&mut tx, &name).await?.is_some() {
            drop(tx);
            let error = VaultError::validation(format!("Secret '{}' already exists", name));
            self.audit_failure(&name, AuditDetails::WriteFailed { error: error.to_string() }, actor)
                .await;
            return Err(error);
        }

        if let Err(error) = SecretRepository::insert(&mut tx, &record).await {
            drop(tx);
            if error.is_caller_error() {
                // Lost the race against a concurrent store for the same name
                self.audit_failure(
                    &name,
                    AuditDetails::WriteFailed { error: error.to_string() },
                    actor,
                )
                .await;
            }
            return Err(error);
        }

        let audit = NewAuditRecord::new(
            &name,
            actor,
            AuditDetails::Write {
                created: true,
                description_set: record.description.is_some(),
                rotation_policy_set: record.rotation_policy.is_some(),
            },
        );
        AuditLogRepository::insert(&mut tx, &audit).await?;
        self.commit(tx).await?;

        info!(secret_id = %record.id, secret_name = %name, "Stored new secret");
        Ok(record)
    }

    /// Retrieve and decrypt a secret value, updating access bookkeeping.
    #[instrument(skip(self, actor), fields(secret_name = %name), name = "vault_retrieve")]
    pub async fn retrieve(&self, name: &str, actor: &ActorContext) -> Result<String> {
        let name = name.trim();

        let mut tx = self.begin().await?;

        let Some(record) = SecretRepository::find_by_name(&mut tx, name).await? else {
            drop(tx);
            let error = VaultError::not_found(name);
            self.audit_failure(name, AuditDetails::ReadFailed { error: error.to_string() }, actor)
                .await;
            return Err(error);
        };

        let plaintext = self.encryption.decrypt(&record.encrypted_value)?;

        let access_count = record.access_count + 1;
        let accessed_at = Utc::now();
        SecretRepository::record_access(&mut tx, &record.id, access_count, accessed_at).await?;

        let audit = NewAuditRecord::new(name, actor, AuditDetails::Read { access_count });
        AuditLogRepository::insert(&mut tx, &audit).await?;
        self.commit(tx).await?;

        Ok(plaintext)
    }

    /// Replace a secret's value, and optionally its description and
    /// rotation policy.
    #[instrument(skip(self, request, actor), fields(secret_name = %name), name = "vault_update")]
    pub async fn update(
        &self,
        name: &str,
        request: UpdateSecretRequest,
        actor: &ActorContext,
    ) -> Result<SecretRecord> {
        let name = name.trim();
        if request.value.is_empty() {
            let error = VaultError::validation_field("Secret value cannot be empty", "value");
            self.audit_failure(name, AuditDetails::WriteFailed { error: error.to_string() }, actor)
                .await;
            return Err(error);
        }

        let mut tx = self.begin().await?;

        let Some(mut record) = SecretRepository::find_by_name(&mut tx, name).await? else {
            drop(tx);
            let error = VaultError::not_found(name);
            self.audit_failure(name, AuditDetails::WriteFailed { error: error.to_string() }, actor)
                .await;
            return Err(error);
        };

        let description_set = request.description.is_some();
        let rotation_policy_set = request.rotation_policy.is_some();

        record.encrypted_value = self.encryption.encrypt(&request.value)?;
        record.key_fingerprint = self.encryption.fingerprint().to_string();
        record.updated_at = Utc::now();
        if let Some(description) = request.description {
            record.description = Some(description);
        }
        if let Some(policy) = request.rotation_policy {
            record.rotation_policy = Some(policy);
        }

        SecretRepository::update_value(&mut tx, &record).await?;

        let audit = NewAuditRecord::new(
            name,
            actor,
            AuditDetails::Write { created: false, description_set, rotation_policy_set },
        );
        AuditLogRepository::insert(&mut tx, &audit).await?;
        self.commit(tx).await?;

        info!(secret_id = %record.id, secret_name = %name, "Updated secret");
        Ok(record)
    }

    /// Rotate a secret's value. Semantically a value-only update, but
    /// audited as ROTATE with the prior and new key fingerprints so
    /// cross-key rotations stay traceable.
    #[instrument(skip(self, new_value, actor), fields(secret_name = %name), name = "vault_rotate")]
    pub async fn rotate(
        &self,
        name: &str,
        new_value: &str,
        actor: &ActorContext,
    ) -> Result<SecretRecord> {
        let name = name.trim();
        if new_value.is_empty() {
            let error = VaultError::validation_field("Secret value cannot be empty", "value");
            self.audit_failure(name, AuditDetails::RotateFailed { error: error.to_string() }, actor)
                .await;
            return Err(error);
        }

        let mut tx = self.begin().await?;

        let Some(mut record) = SecretRepository::find_by_name(&mut tx, name).await? else {
            drop(tx);
            let error = VaultError::not_found(name);
            self.audit_failure(name, AuditDetails::RotateFailed { error: error.to_string() }, actor)
                .await;
            return Err(error);
        };

        let previous_fingerprint = record.key_fingerprint.clone();
        record.encrypted_value = self.encryption.encrypt(new_value)?;
        record.key_fingerprint = self.encryption.fingerprint().to_string();
        record.updated_at = Utc::now();

        SecretRepository::update_value(&mut tx, &record).await?;

        let audit = NewAuditRecord::new(
            name,
            actor,
            AuditDetails::Rotate {
                previous_fingerprint,
                new_fingerprint: record.key_fingerprint.clone(),
                access_count: record.access_count,
            },
        );
        AuditLogRepository::insert(&mut tx, &audit).await?;
        self.commit(tx).await?;

        info!(secret_id = %record.id, secret_name = %name, "Rotated secret");
        Ok(record)
    }

    /// Permanently delete a secret. The audit entry captures pre-deletion
    /// metadata and is written before the row is removed, in the same
    /// transaction.
    #[instrument(skip(self, actor), fields(secret_name = %name), name = "vault_delete")]
    pub async fn delete(&self, name: &str, actor: &ActorContext) -> Result<()> {
        let name = name.trim();

        let mut tx = self.begin().await?;

        let Some(record) = SecretRepository::find_by_name(&mut tx, name).await? else {
            drop(tx);
            let error = VaultError::not_found(name);
            self.audit_failure(name, AuditDetails::DeleteFailed { error: error.to_string() }, actor)
                .await;
            return Err(error);
        };

        let audit = NewAuditRecord::new(
            name,
            actor,
            AuditDetails::Delete {
                secret_id: record.id.to_string(),
                access_count: record.access_count,
                created_at: record.created_at,
            },
        );
        AuditLogRepository::insert(&mut tx, &audit).await?;
        SecretRepository::delete(&mut tx, &record.id).await?;
        self.commit(tx).await?;

        info!(secret_id = %record.id, secret_name = %name, "Deleted secret");
        Ok(())
    }

    /// List all secrets without their encrypted values. Appends one bulk
    /// READ audit entry under the sentinel name.
    #[instrument(skip(self, actor), name = "vault_list")]
    pub async fn list(
        &self,
        include_metadata: bool,
        actor: &ActorContext,
    ) -> Result<Vec<SecretSummary>> {
        let mut tx = self.begin().await?;

        let records = SecretRepository::list_all(&mut tx).await?;
        let summaries: Vec<SecretSummary> =
            records.iter().map(|record| record.summarize(include_metadata)).collect();

        let audit = NewAuditRecord::new(
            BULK_SECRET_NAME,
            actor,
            AuditDetails::List { count: summaries.len() as i64, include_metadata },
        );
        AuditLogRepository::insert(&mut tx, &audit).await?;
        self.commit(tx).await?;

        Ok(summaries)
    }

    /// Query the audit trail, newest first.
    #[instrument(skip(self), name = "vault_audit_log")]
    pub async fn audit_log(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>> {
        let mut conn = self.pool.acquire().await.map_err(|e| VaultError::Database {
            source: e,
            context: "Failed to acquire connection for audit query".to_string(),
        })?;

        AuditLogRepository::query(&mut conn, query).await
    }

    async fn begin(&self) -> Result<Transaction<'_, Sqlite>> {
        self.pool.begin().await.map_err(|e| VaultError::Database {
            source: e,
            context: "Failed to begin vault transaction".to_string(),
        })
    }

    async fn commit(&self, tx: Transaction<'_, Sqlite>) -> Result<()> {
        tx.commit().await.map_err(|e| VaultError::Database {
            source: e,
            context: "Failed to commit vault transaction".to_string(),
        })
    }

    /// Record an audit entry for a failed operation in its own committed
    /// transaction. Best-effort: an insert failure here must not mask the
    /// operation error the caller is about to receive.
    async fn audit_failure(&self, secret_name: &str, details: AuditDetails, actor: &ActorContext) {
        let record = NewAuditRecord::new(secret_name, actor, details);

        let result = async {
            let mut tx = self.begin().await?;
            AuditLogRepository::insert(&mut tx, &record).await?;
            self.commit(tx).await
        }
        .await;

        if let Err(error) = result {
            warn!(
                error = %error,
                secret_name = %secret_name,
                "Failed to record audit entry for failed operation"
            );
        }
    }
}
