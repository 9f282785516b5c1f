//! Audit trail domain model
//!
//! Every vault operation, successful or failed, produces exactly one audit
//! entry. The `details` payload is a tagged union per action kind so the
//! audit schema stays checkable instead of an untyped map.

use crate::errors::VaultError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel secret name used for bulk operations (list)
pub const BULK_SECRET_NAME: &str = "*";

/// Caller attribution attached to every audit entry.
///
/// Used purely for audit bookkeeping; no authorization decision is made
/// from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ActorContext {
    /// Attribution for internal operations (config bridge, migrations)
    pub fn system() -> Self {
        Self {
            user_id: None,
            ip_address: Some("127.0.0.1".to_string()),
            user_agent: Some("config-bridge".to_string()),
        }
    }
}

/// Action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Read,
    Write,
    Rotate,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Read => "READ",
            AuditAction::Write => "WRITE",
            AuditAction::Rotate => "ROTATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READ" => Ok(AuditAction::Read),
            "WRITE" => Ok(AuditAction::Write),
            "ROTATE" => Ok(AuditAction::Rotate),
            "DELETE" => Ok(AuditAction::Delete),
            other => Err(VaultError::validation(format!("Unknown audit action '{}'", other))),
        }
    }
}

/// Action-specific audit payload.
///
/// The action column is always derived from the variant via
/// [`AuditDetails::action`], so payload and action cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditDetails {
    /// Secret created or updated
    Write { created: bool, description_set: bool, rotation_policy_set: bool },
    /// Store/update attempt that failed validation or lookup
    WriteFailed { error: String },
    /// Successful retrieval; carries the post-increment access count
    Read { access_count: i64 },
    /// Retrieval of a name with no live secret
    ReadFailed { error: String },
    /// Bulk listing under the sentinel name
    List { count: i64, include_metadata: bool },
    /// Value rotation with key fingerprints for traceability
    Rotate { previous_fingerprint: String, new_fingerprint: String, access_count: i64 },
    /// Rotation attempt on a missing secret
    RotateFailed { error: String },
    /// Pre-deletion snapshot of the removed secret
    Delete { secret_id: String, access_count: i64, created_at: chrono::DateTime<chrono::Utc> },
    /// Deletion attempt on a missing secret
    DeleteFailed { error: String },
}

impl AuditDetails {
    /// The audit action this payload belongs to
    pub fn action(&self) -> AuditAction {
        match self {
            AuditDetails::Write { .. } | AuditDetails::WriteFailed { .. } => AuditAction::Write,
            AuditDetails::Read { .. }
            | AuditDetails::ReadFailed { .. }
            | AuditDetails::List { .. } => AuditAction::Read,
            AuditDetails::Rotate { .. } | AuditDetails::RotateFailed { .. } => AuditAction::Rotate,
            AuditDetails::Delete { .. } | AuditDetails::DeleteFailed { .. } => AuditAction::Delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_roundtrip() {
        for action in
            [AuditAction::Read, AuditAction::Write, AuditAction::Rotate, AuditAction::Delete]
        {
            let parsed: AuditAction = action.as_str().parse().unwrap();
            assert_eq!(parsed, action);
        }
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!("PURGE".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_details_derive_action() {
        assert_eq!(
            AuditDetails::Read { access_count: 3 }.action(),
            AuditAction::Read,
        );
        assert_eq!(
            AuditDetails::List { count: 0, include_metadata: false }.action(),
            AuditAction::Read,
        );
        assert_eq!(
            AuditDetails::RotateFailed { error: "missing".into() }.action(),
            AuditAction::Rotate,
        );
    }

    #[test]
    fn test_details_json_roundtrip() {
        let details = AuditDetails::Rotate {
            previous_fingerprint: "aaaa".into(),
            new_fingerprint: "bbbb".into(),
            access_count: 7,
        };
        let json = serde_json::to_string(&details).unwrap();
        assert!(json.contains("\"event\":\"rotate\""));
        let back: AuditDetails = serde_json::from_str(&json).unwrap();
        assert_eq!(back, details);
    }
}
