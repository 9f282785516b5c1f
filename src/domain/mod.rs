//! Domain types shared across storage and services.

pub mod audit;
pub mod id;

pub use audit::{ActorContext, AuditAction, AuditDetails, BULK_SECRET_NAME};
pub use id::{AuditEntryId, SecretId};
