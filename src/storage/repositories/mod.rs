//! Repositories for vault persistence.

pub mod audit_log;
pub mod secret;

pub use audit_log::{AuditLogRepository, AuditQuery, AuditRecord, NewAuditRecord};
pub use secret::{SecretMetadata, SecretRecord, SecretRepository, SecretSummary};
