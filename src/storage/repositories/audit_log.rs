//! Audit log repository
//!
//! Append-only storage for the vault audit trail. Entries are never updated
//! or deleted, even when the secret they describe is later removed.

use crate::domain::{ActorContext, AuditAction, AuditDetails, AuditEntryId};
use crate::errors::{Result, VaultError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

/// A new audit entry awaiting insertion. The action column is always
/// derived from the details payload.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub secret_name: String,
    pub actor: ActorContext,
    pub details: AuditDetails,
    pub timestamp: DateTime<Utc>,
}

impl NewAuditRecord {
    pub fn new(secret_name: impl Into<String>, actor: &ActorContext, details: AuditDetails) -> Self {
        Self {
            secret_name: secret_name.into(),
            actor: actor.clone(),
            details,
            timestamp: Utc::now(),
        }
    }
}

/// A persisted audit entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub id: AuditEntryId,
    pub secret_name: String,
    pub action: AuditAction,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub details: AuditDetails,
}

/// Filter for audit trail queries
#[derive(Debug, Clone)]
pub struct AuditQuery {
    /// Restrict to a single secret name (the bulk sentinel is a valid name)
    pub secret_name: Option<String>,
    /// Restrict to a single action kind
    pub action: Option<AuditAction>,
    /// Maximum number of entries returned, clamped to 1..=1000
    pub limit: i64,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self { secret_name: None, action: None, limit: 100 }
    }
}

#[derive(Debug, Clone, FromRow)]
struct AuditRow {
    pub id: String,
    pub secret_name: String,
    pub action: String,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
}

/// Repository for audit trail access
pub struct AuditLogRepository;

impl AuditLogRepository {
    /// Append one audit entry
    pub async fn insert(conn: &mut SqliteConnection, record: &NewAuditRecord) -> Result<()> {
        let details_json =
            serde_json::to_string(&record.details).map_err(|e| VaultError::Serialization {
                source: e,
                context: "Failed to serialize audit details".to_string(),
            })?;

        sqlx::query(
            "INSERT INTO secret_audit_log (id, secret_name, action, user_id, ip_address, \
             user_agent, timestamp, details) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(AuditEntryId::new().as_str())
        .bind(&record.secret_name)
        .bind(record.details.action().as_str())
        .bind(&record.actor.user_id)
        .bind(&record.actor.ip_address)
        .bind(&record.actor.user_agent)
        .bind(record.timestamp)
        .bind(details_json)
        .execute(conn)
        .await
        .map_err(|e| VaultError::Database {
            source: e,
            context: format!("Failed to write audit entry for '{}'", record.secret_name),
        })?;

        Ok(())
    }

    /// Query audit entries, newest first. `rowid` breaks ties between
    /// entries sharing a timestamp so ordering stays deterministic.
    pub async fn query(conn: &mut SqliteConnection, query: &AuditQuery) -> Result<Vec<AuditRecord>> {
        let mut sql = String::from(
            "SELECT id, secret_name, action, user_id, ip_address, user_agent, timestamp, details \
             FROM secret_audit_log",
        );

        let mut clauses = Vec::new();
        let mut bind_index = 0;
        if query.secret_name.is_some() {
            bind_index += 1;
            clauses.push(format!("secret_name = ${}", bind_index));
        }
        if query.action.is_some() {
            bind_index += 1;
            clauses.push(format!("action = ${}", bind_index));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY timestamp DESC, rowid DESC LIMIT ${}", bind_index + 1));

        let mut db_query = sqlx::query_as::<_, AuditRow>(&sql);
        if let Some(name) = &query.secret_name {
            db_query = db_query.bind(name);
        }
        if let Some(action) = query.action {
            db_query = db_query.bind(action.as_str());
        }
        db_query = db_query.bind(query.limit.clamp(1, 1000));

        let rows = db_query.fetch_all(conn).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to query audit log");
            VaultError::Database { source: e, context: "Failed to query audit log".to_string() }
        })?;

        rows.into_iter().map(to_record).collect()
    }
}

fn to_record(row: AuditRow) -> Result<AuditRecord> {
    let action: AuditAction = row.action.parse()?;

    let details_json = row.details.ok_or_else(|| {
        VaultError::internal(format!("Audit entry '{}' has no details payload", row.id))
    })?;
    let details: AuditDetails =
        serde_json::from_str(&details_json).map_err(|e| VaultError::Serialization {
            source: e,
            context: format!("Invalid audit details JSON for entry '{}'", row.id),
        })?;

    Ok(AuditRecord {
        id: AuditEntryId::from_string(row.id),
        secret_name: row.secret_name,
        action,
        user_id: row.user_id,
        ip_address: row.ip_address,
        user_agent: row.user_agent,
        timestamp: row.timestamp,
        details,
    })
}
