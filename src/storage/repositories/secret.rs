//! Secret repository
//!
//! Data access for encrypted secrets. All functions operate on a borrowed
//! connection so the vault service can compose a secret mutation and its
//! audit record inside one transaction. The UNIQUE constraint on `name` is
//! the hard uniqueness guarantee; any pre-check in the service layer is
//! advisory only.

use crate::domain::SecretId;
use crate::errors::{Result, VaultError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

/// Database row structure for secrets
#[derive(Debug, Clone, FromRow)]
struct SecretRow {
    pub id: String,
    pub name: String,
    pub encrypted_value: String,
    pub description: Option<String>,
    pub rotation_policy: Option<String>,
    pub access_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub key_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored secret. The encrypted value is carried for vault-internal use
/// but never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct SecretRecord {
    pub id: SecretId,
    pub name: String,
    #[serde(skip_serializing)]
    pub encrypted_value: String,
    pub description: Option<String>,
    /// Opaque rotation configuration; stored and returned verbatim, never
    /// interpreted by the vault.
    pub rotation_policy: Option<serde_json::Value>,
    pub access_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub key_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry; never contains the encrypted value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretSummary {
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Access counters and fingerprint, withheld unless requested
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SecretMetadata>,
}

/// Optional listing metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretMetadata {
    pub access_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub key_fingerprint: String,
    pub has_rotation_policy: bool,
}

const SELECT_COLUMNS: &str = "id, name, encrypted_value, description, rotation_policy, \
     access_count, last_accessed_at, key_fingerprint, created_at, updated_at";

/// Repository for secret data access
pub struct SecretRepository;

impl SecretRepository {
    /// Fetch a secret by name
    pub async fn find_by_name(
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<SecretRecord>> {
        let row = sqlx::query_as::<_, SecretRow>(&format!(
            "SELECT {} FROM secrets WHERE name = $1",
            SELECT_COLUMNS
        ))
        .bind(name)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, secret_name = %name, "Failed to get secret by name");
            VaultError::Database {
                source: e,
                context: format!("Failed to get secret '{}'", name),
            }
        })?;

        row.map(to_record).transpose()
    }

    /// Insert a new secret. A uniqueness violation on `name` is translated
    /// to the same validation error an advisory pre-check produces, so
    /// concurrent racing inserts are indistinguishable from a pre-check hit.
    pub async fn insert(conn: &mut SqliteConnection, record: &SecretRecord) -> Result<()> {
        let rotation_policy = encode_rotation_policy(record.rotation_policy.as_ref())?;

        sqlx::query(
            "INSERT INTO secrets (id, name, encrypted_value, description, rotation_policy, \
             access_count, last_accessed_at, key_fingerprint, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(record.id.as_str())
        .bind(&record.name)
        .bind(&record.encrypted_value)
        .bind(&record.description)
        .bind(rotation_policy)
        .bind(record.access_count)
        .bind(record.last_accessed_at)
        .bind(&record.key_fingerprint)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(conn)
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                VaultError::validation(format!("Secret '{}' already exists", record.name))
            } else {
                tracing::error!(error = %e, secret_name = %record.name, "Failed to insert secret");
                VaultError::Database {
                    source: e,
                    context: format!("Failed to insert secret '{}'", record.name),
                }
            }
        })?;

        Ok(())
    }

    /// Replace the encrypted value (and optionally metadata) of a secret
    pub async fn update_value(conn: &mut SqliteConnection, record: &SecretRecord) -> Result<()> {
        let rotation_policy = encode_rotation_policy(record.rotation_policy.as_ref())?;

        let result = sqlx::query(
            "UPDATE secrets SET encrypted_value = $1, description = $2, rotation_policy = $3, \
             key_fingerprint = $4, updated_at = $5 WHERE id = $6",
        )
        .bind(&record.encrypted_value)
        .bind(&record.description)
        .bind(rotation_policy)
        .bind(&record.key_fingerprint)
        .bind(record.updated_at)
        .bind(record.id.as_str())
        .execute(conn)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to update secret '{}'", record.name),
        })?;

        if result.rows_affected() == 0 {
            return Err(VaultError::not_found(record.name.clone()));
        }

        Ok(())
    }

    /// Record a successful retrieval: bump the counter and stamp the access
    pub async fn record_access(
        conn: &mut SqliteConnection,
        id: &SecretId,
        access_count: i64,
        accessed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE secrets SET access_count = $1, last_accessed_at = $2 WHERE id = $3")
            .bind(access_count)
            .bind(accessed_at)
            .bind(id.as_str())
            .execute(conn)
            .await
            .map_err(|e| VaultError::Database {
                source: e,
                context: format!("Failed to record access for secret '{}'", id),
            })?;

        Ok(())
    }

    /// Hard-delete a secret by id
    pub async fn delete(conn: &mut SqliteConnection, id: &SecretId) -> Result<()> {
        let result = sqlx::query("DELETE FROM secrets WHERE id = $1")
            .bind(id.as_str())
            .execute(conn)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, secret_id = %id, "Failed to delete secret");
                VaultError::Database {
                    source: e,
                    context: format!("Failed to delete secret '{}'", id),
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(VaultError::internal(format!("Secret '{}' vanished during delete", id)));
        }

        Ok(())
    }

    /// List all secrets, oldest first
    pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<SecretRecord>> {
        let rows = sqlx::query_as::<_, SecretRow>(&format!(
            "SELECT {} FROM secrets ORDER BY created_at ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(conn)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list secrets");
            VaultError::Database { source: e, context: "Failed to list secrets".to_string() }
        })?;

        rows.into_iter().map(to_record).collect()
    }
}

impl SecretRecord {
    /// Listing projection; metadata only when requested
    pub fn summarize(&self, include_metadata: bool) -> SecretSummary {
        SecretSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            metadata: include_metadata.then(|| SecretMetadata {
                access_count: self.access_count,
                last_accessed_at: self.last_accessed_at,
                key_fingerprint: self.key_fingerprint.clone(),
                has_rotation_policy: self.rotation_policy.is_some(),
            }),
        }
    }
}

fn to_record(row: SecretRow) -> Result<SecretRecord> {
    let rotation_policy = row
        .rotation_policy
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| VaultError::Serialization {
            source: e,
            context: format!("Invalid rotation policy JSON for secret '{}'", row.name),
        })?;

    Ok(SecretRecord {
        id: SecretId::from_string(row.id),
        name: row.name,
        encrypted_value: row.encrypted_value,
        description: row.description,
        rotation_policy,
        access_count: row.access_count,
        last_accessed_at: row.last_accessed_at,
        key_fingerprint: row.key_fingerprint,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn encode_rotation_policy(policy: Option<&serde_json::Value>) -> Result<Option<String>> {
    policy
        .map(|value| {
            serde_json::to_string(value).map_err(|e| VaultError::Serialization {
                source: e,
                context: "Failed to serialize rotation policy".to_string(),
            })
        })
        .transpose()
}
