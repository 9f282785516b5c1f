//! End-to-end lifecycle tests for the secret vault.

mod common;

use common::{TestDatabase, OTHER_MASTER_KEY, TEST_MASTER_KEY};
use securevault::{
    ActorContext, AuditAction, AuditDetails, AuditQuery, SecretVault, StoreSecretRequest,
    UpdateSecretRequest, VaultError, BULK_SECRET_NAME,
};

fn test_actor() -> ActorContext {
    ActorContext {
        user_id: Some("integration-tests".to_string()),
        ip_address: Some("192.0.2.10".to_string()),
        user_agent: Some("vault-test-suite".to_string()),
    }
}

#[tokio::test]
async fn full_secret_lifecycle_with_audit_trail() {
    let db = TestDatabase::new().await;
    let vault = SecretVault::new(db.pool.clone(), TEST_MASTER_KEY).unwrap();
    let actor = test_actor();

    let record = vault
        .store(
            StoreSecretRequest::new("db_password", "initial-value")
                .with_description("Primary database password"),
            &actor,
        )
        .await
        .unwrap();
    assert_eq!(record.name, "db_password");
    assert_eq!(record.access_count, 0);
    assert!(record.last_accessed_at.is_none());

    assert_eq!(vault.retrieve("db_password", &actor).await.unwrap(), "initial-value");

    vault.rotate("db_password", "rotated-value", &actor).await.unwrap();

    assert_eq!(vault.retrieve("db_password", &actor).await.unwrap(), "rotated-value");

    vault.delete("db_password", &actor).await.unwrap();

    // Newest first: DELETE, READ, ROTATE, READ, WRITE
    let records = vault
        .audit_log(&AuditQuery {
            secret_name: Some("db_password".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let actions: Vec<AuditAction> = records.iter().map(|r| r.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Delete,
            AuditAction::Read,
            AuditAction::Rotate,
            AuditAction::Read,
            AuditAction::Write,
        ]
    );

    for record in &records {
        assert_eq!(record.user_id.as_deref(), Some("integration-tests"));
        assert_eq!(record.ip_address.as_deref(), Some("192.0.2.10"));
    }

    // The deleted secret is gone, and the failed lookup itself is audited
    let result = vault.retrieve("db_password", &actor).await;
    assert!(matches!(result, Err(VaultError::NotFound { .. })));

    let records = vault
        .audit_log(&AuditQuery {
            secret_name: Some("db_password".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(records.len(), 6);
    assert_eq!(records[0].action, AuditAction::Read);
    assert!(matches!(records[0].details, AuditDetails::ReadFailed { .. }));
}

#[tokio::test]
async fn access_bookkeeping_counts_every_retrieval() {
    let db = TestDatabase::new().await;
    let vault = SecretVault::new(db.pool.clone(), TEST_MASTER_KEY).unwrap();
    let actor = test_actor();

    vault.store(StoreSecretRequest::new("counted", "value"), &actor).await.unwrap();

    for _ in 0..3 {
        vault.retrieve("counted", &actor).await.unwrap();
    }

    let records = vault
        .audit_log(&AuditQuery {
            secret_name: Some("counted".to_string()),
            action: Some(AuditAction::Read),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
    // Newest first, so counts descend
    let counts: Vec<i64> = records
        .iter()
        .map(|r| match &r.details {
            AuditDetails::Read { access_count } => *access_count,
            other => panic!("expected read details, got {:?}", other),
        })
        .collect();
    assert_eq!(counts, vec![3, 2, 1]);

    let summaries = vault.list(true, &actor).await.unwrap();
    let metadata = summaries[0].metadata.as_ref().unwrap();
    assert_eq!(metadata.access_count, 3);
    assert!(metadata.last_accessed_at.is_some());
}

#[tokio::test]
async fn names_are_unique_and_collisions_are_audited() {
    let db = TestDatabase::new().await;
    let vault = SecretVault::new(db.pool.clone(), TEST_MASTER_KEY).unwrap();
    let actor = test_actor();

    vault.store(StoreSecretRequest::new("api_key", "original"), &actor).await.unwrap();

    let result = vault.store(StoreSecretRequest::new("api_key", "imposter"), &actor).await;
    match result {
        Err(VaultError::Validation { message, .. }) => {
            assert!(message.contains("already exists"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    assert_eq!(vault.retrieve("api_key", &actor).await.unwrap(), "original");

    let records = vault
        .audit_log(&AuditQuery {
            secret_name: Some("api_key".to_string()),
            action: Some(AuditAction::Write),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert!(matches!(records[0].details, AuditDetails::WriteFailed { .. }));
    assert!(matches!(records[1].details, AuditDetails::Write { created: true, .. }));
}

#[tokio::test]
async fn update_replaces_value_and_merges_metadata() {
    let db = TestDatabase::new().await;
    let vault = SecretVault::new(db.pool.clone(), TEST_MASTER_KEY).unwrap();
    let actor = test_actor();

    vault
        .store(
            StoreSecretRequest::new("service_token", "v1").with_description("before"),
            &actor,
        )
        .await
        .unwrap();

    // Value-only update keeps the existing description
    let updated = vault
        .update("service_token", UpdateSecretRequest::new("v2"), &actor)
        .await
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("before"));

    let mut request = UpdateSecretRequest::new("v3");
    request.description = Some("after".to_string());
    let updated = vault.update("service_token", request, &actor).await.unwrap();
    assert_eq!(updated.description.as_deref(), Some("after"));

    assert_eq!(vault.retrieve("service_token", &actor).await.unwrap(), "v3");

    let result = vault.update("missing", UpdateSecretRequest::new("x"), &actor).await;
    assert!(matches!(result, Err(VaultError::NotFound { .. })));
}

#[tokio::test]
async fn rotation_records_key_fingerprints() {
    let db = TestDatabase::new().await;
    let vault = SecretVault::new(db.pool.clone(), TEST_MASTER_KEY).unwrap();
    let other_vault = SecretVault::new(db.pool.clone(), OTHER_MASTER_KEY).unwrap();
    let actor = test_actor();

    assert_ne!(vault.key_fingerprint(), other_vault.key_fingerprint());

    vault.store(StoreSecretRequest::new("rotated", "v1"), &actor).await.unwrap();

    // Rotation under a different master key re-encrypts without reading the
    // old value, so the fingerprints in the audit entry differ
    other_vault.rotate("rotated", "v2", &actor).await.unwrap();

    let records = vault
        .audit_log(&AuditQuery {
            secret_name: Some("rotated".to_string()),
            action: Some(AuditAction::Rotate),
            ..Default::default()
        })
        .await
        .unwrap();
    match &records[0].details {
        AuditDetails::Rotate { previous_fingerprint, new_fingerprint, .. } => {
            assert_eq!(previous_fingerprint.as_str(), vault.key_fingerprint());
            assert_eq!(new_fingerprint.as_str(), other_vault.key_fingerprint());
            assert_ne!(previous_fingerprint, new_fingerprint);
        }
        other => panic!("expected rotate details, got {:?}", other),
    }

    // Only the rotating key can now decrypt; the old key gets one opaque error
    assert_eq!(other_vault.retrieve("rotated", &actor).await.unwrap(), "v2");
    let result = vault.retrieve("rotated", &actor).await;
    match result {
        Err(VaultError::Encryption { message }) => {
            assert_eq!(message, "Failed to decrypt secret value");
        }
        other => panic!("expected encryption error, got {:?}", other),
    }
}

#[tokio::test]
async fn list_controls_metadata_exposure_and_audits_once() {
    let db = TestDatabase::new().await;
    let vault = SecretVault::new(db.pool.clone(), TEST_MASTER_KEY).unwrap();
    let actor = test_actor();

    vault
        .store(
            StoreSecretRequest::new("first", "value-1")
                .with_rotation_policy(serde_json::json!({"interval_days": 30})),
            &actor,
        )
        .await
        .unwrap();
    vault.store(StoreSecretRequest::new("second", "value-2"), &actor).await.unwrap();

    let plain = vault.list(false, &actor).await.unwrap();
    assert_eq!(plain.len(), 2);
    assert!(plain.iter().all(|s| s.metadata.is_none()));

    let detailed = vault.list(true, &actor).await.unwrap();
    let first = detailed.iter().find(|s| s.name == "first").unwrap();
    let second = detailed.iter().find(|s| s.name == "second").unwrap();
    assert!(first.metadata.as_ref().unwrap().has_rotation_policy);
    assert!(!second.metadata.as_ref().unwrap().has_rotation_policy);

    let records = vault
        .audit_log(&AuditQuery {
            secret_name: Some(BULK_SECRET_NAME.to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.action, AuditAction::Read);
        assert!(matches!(record.details, AuditDetails::List { count: 2, .. }));
    }
}

#[tokio::test]
async fn audit_query_filters_and_limits() {
    let db = TestDatabase::new().await;
    let vault = SecretVault::new(db.pool.clone(), TEST_MASTER_KEY).unwrap();
    let actor = test_actor();

    for i in 0..5 {
        vault
            .store(StoreSecretRequest::new(format!("secret_{}", i), "value"), &actor)
            .await
            .unwrap();
    }
    vault.retrieve("secret_0", &actor).await.unwrap();

    let all = vault.audit_log(&AuditQuery::default()).await.unwrap();
    assert_eq!(all.len(), 6);

    let limited = vault.audit_log(&AuditQuery { limit: 2, ..Default::default() }).await.unwrap();
    assert_eq!(limited.len(), 2);

    let writes = vault
        .audit_log(&AuditQuery { action: Some(AuditAction::Write), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(writes.len(), 5);

    let for_one = vault
        .audit_log(&AuditQuery {
            secret_name: Some("secret_0".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(for_one.len(), 2);
}

#[tokio::test]
async fn delete_audit_preserves_pre_deletion_metadata() {
    let db = TestDatabase::new().await;
    let vault = SecretVault::new(db.pool.clone(), TEST_MASTER_KEY).unwrap();
    let actor = test_actor();

    let stored = vault.store(StoreSecretRequest::new("ephemeral", "v"), &actor).await.unwrap();
    vault.retrieve("ephemeral", &actor).await.unwrap();
    vault.delete("ephemeral", &actor).await.unwrap();

    let records = vault
        .audit_log(&AuditQuery {
            secret_name: Some("ephemeral".to_string()),
            action: Some(AuditAction::Delete),
            ..Default::default()
        })
        .await
        .unwrap();
    match &records[0].details {
        AuditDetails::Delete { secret_id, access_count, .. } => {
            assert_eq!(secret_id.as_str(), stored.id.as_str());
            assert_eq!(*access_count, 1);
        }
        other => panic!("expected delete details, got {:?}", other),
    }

    // Deleting again fails and leaves its own audit entry
    let result = vault.delete("ephemeral", &actor).await;
    assert!(matches!(result, Err(VaultError::NotFound { .. })));

    let records = vault
        .audit_log(&AuditQuery {
            secret_name: Some("ephemeral".to_string()),
            action: Some(AuditAction::Delete),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert!(matches!(records[0].details, AuditDetails::DeleteFailed { .. }));
}

#[tokio::test]
async fn master_key_is_validated_at_construction() {
    let db = TestDatabase::new().await;

    let result = SecretVault::new(db.pool.clone(), "");
    assert!(matches!(result, Err(VaultError::MasterKey { .. })));

    let result = SecretVault::new(db.pool.clone(), "too-short");
    assert!(matches!(result, Err(VaultError::MasterKey { .. })));
}
