mod common;

use chrono::{Duration, TimeZone, Utc};
use common::{FlakyStore, create_key, reload};
use license_key_server::{
    error::AppError,
    models::{
        key::KeyChanges,
        verification::{DenyReason, Verification},
    },
    services::key_service,
    store::MemoryKeyStore,
};
use uuid::Uuid;

fn denied(reason: DenyReason) -> Verification {
    Verification::Denied(reason)
}

#[tokio::test]
async fn created_key_starts_enabled_and_unbound() {
    let store = MemoryKeyStore::new();
    let key = create_key(&store, "Customer #1", None).await;

    assert_eq!(key.key.len(), 16);
    assert!(key.key.chars().all(|c| c.is_ascii_alphanumeric()));
    assert!(key.enabled);
    assert_eq!(key.label.as_deref(), Some("Customer #1"));
    assert_eq!(key.hwid, None);
    assert_eq!(key.active_hwid, None);
    assert_eq!(key.last_seen, None);
    assert_eq!(key.expires_at, None);
}

#[tokio::test]
async fn created_key_without_label_gets_empty_label() {
    let store = MemoryKeyStore::new();
    let key = key_service::create_key(&store, Default::default()).await.unwrap();
    assert_eq!(key.label.as_deref(), Some(""));
}

#[tokio::test]
async fn list_returns_newest_first() {
    let store = MemoryKeyStore::new();
    let a = create_key(&store, "A", None).await;
    let b = create_key(&store, "B", None).await;
    let c = create_key(&store, "C", None).await;

    let listed: Vec<Uuid> = key_service::list_keys(&store)
        .await
        .unwrap()
        .into_iter()
        .map(|k| k.id)
        .collect();

    assert_eq!(listed, vec![c.id, b.id, a.id]);
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let store = MemoryKeyStore::new();
    let expires_at = Utc::now() + Duration::days(30);
    let key = create_key(&store, "Before", Some(expires_at)).await;

    let changes = KeyChanges {
        label: Some(Some("After".to_string())),
        ..KeyChanges::default()
    };
    let updated = key_service::update_key(&store, &key.id.to_string(), changes)
        .await
        .unwrap();

    assert_eq!(updated.label.as_deref(), Some("After"));
    assert!(updated.enabled);
    assert_eq!(updated.expires_at, key.expires_at);
    assert_eq!(updated.key, key.key);
    assert_eq!(updated.created_at, key.created_at);
}

#[tokio::test]
async fn update_of_missing_key_is_not_found() {
    let store = MemoryKeyStore::new();
    let changes = KeyChanges {
        enabled: Some(false),
        ..KeyChanges::default()
    };

    let missing = key_service::update_key(&store, &Uuid::new_v4().to_string(), changes.clone()).await;
    assert!(matches!(missing, Err(AppError::KeyNotFound)));

    let malformed = key_service::update_key(&store, "not-a-uuid", changes).await;
    assert!(matches!(malformed, Err(AppError::KeyNotFound)));
}

#[tokio::test]
async fn empty_update_returns_current_record() {
    let store = MemoryKeyStore::new();
    let key = create_key(&store, "Same", None).await;

    let updated = key_service::update_key(&store, &key.id.to_string(), KeyChanges::default())
        .await
        .unwrap();
    assert_eq!(updated, key);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let store = MemoryKeyStore::new();
    let key = create_key(&store, "Doomed", None).await;

    key_service::delete_key(&store, &key.id.to_string()).await.unwrap();
    assert!(store.is_empty());

    key_service::delete_key(&store, &key.id.to_string()).await.unwrap();
    key_service::delete_key(&store, "not-a-uuid").await.unwrap();
}

#[tokio::test]
async fn verify_unknown_key_does_not_write() {
    let store = FlakyStore::new();

    let result = key_service::verify_key(&store, "NoSuchKey1234567", Some("HW-1")).await;

    assert_eq!(result, denied(DenyReason::NotFound));
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn disabled_check_precedes_expiry_and_hwid() {
    let store = FlakyStore::new();
    let key = create_key(&store, "Blocked", Some(Utc::now() - Duration::days(1))).await;
    let changes = KeyChanges {
        enabled: Some(false),
        hwid: Some(Some("HW-A".to_string())),
        ..KeyChanges::default()
    };
    key_service::update_key(&store, &key.id.to_string(), changes)
        .await
        .unwrap();
    let writes_before = store.writes();

    let result = key_service::verify_key(&store, &key.key, Some("HW-B")).await;

    assert_eq!(result, denied(DenyReason::Disabled));
    assert_eq!(store.writes(), writes_before);
    assert_eq!(reload(&store, &key).await.last_seen, None);
}

#[tokio::test]
async fn expired_key_is_rejected_without_binding() {
    let store = FlakyStore::new();
    let key = create_key(&store, "Old", Some(Utc::now() - Duration::minutes(1))).await;
    let writes_before = store.writes();

    let result = key_service::verify_key(&store, &key.key, Some("HW-A")).await;

    assert_eq!(result, denied(DenyReason::Expired));
    assert_eq!(store.writes(), writes_before);
    assert_eq!(reload(&store, &key).await.hwid, None);
}

#[tokio::test]
async fn expiry_is_evaluated_at_verification_time() {
    let store = MemoryKeyStore::new();
    let expires_at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let key = create_key(&store, "Timed", Some(expires_at)).await;

    let at_deadline = key_service::verify_key_at(&store, &key.key, None, expires_at).await;
    assert!(at_deadline.is_valid());

    let after = key_service::verify_key_at(
        &store,
        &key.key,
        None,
        expires_at + Duration::milliseconds(1),
    )
    .await;
    assert_eq!(after, denied(DenyReason::Expired));
}

#[tokio::test]
async fn first_hwid_binds_and_later_hwid_mismatches() {
    let store = MemoryKeyStore::new();
    let key = create_key(&store, "Desktop", None).await;

    let first = key_service::verify_key(&store, &key.key, Some("HW-A")).await;
    assert_eq!(
        first,
        Verification::Granted {
            label: Some("Desktop".to_string()),
            expires_at: None,
            hwid: Some("HW-A".to_string()),
        }
    );

    let bound = reload(&store, &key).await;
    assert_eq!(bound.hwid.as_deref(), Some("HW-A"));
    assert_eq!(bound.active_hwid.as_deref(), Some("HW-A"));
    assert!(bound.last_seen.is_some());

    let second = key_service::verify_key(&store, &key.key, Some("HW-B")).await;
    assert_eq!(second, denied(DenyReason::HwidMismatch));

    let after = reload(&store, &key).await;
    assert_eq!(after.hwid.as_deref(), Some("HW-A"));
    assert_eq!(after.last_seen, bound.last_seen);
}

#[tokio::test]
async fn verify_without_hwid_leaves_key_unbound() {
    let store = MemoryKeyStore::new();
    let key = create_key(&store, "Floating", None).await;

    let result = key_service::verify_key(&store, &key.key, None).await;
    assert_eq!(
        result,
        Verification::Granted {
            label: Some("Floating".to_string()),
            expires_at: None,
            hwid: None,
        }
    );

    let after = reload(&store, &key).await;
    assert_eq!(after.hwid, None);
    assert_eq!(after.active_hwid, None);
    assert!(after.last_seen.is_some());
}

#[tokio::test]
async fn empty_hwid_is_treated_as_absent() {
    let store = MemoryKeyStore::new();
    let key = create_key(&store, "Blank", None).await;

    let result = key_service::verify_key(&store, &key.key, Some("")).await;
    assert!(result.is_valid());
    assert_eq!(reload(&store, &key).await.hwid, None);
}

#[tokio::test]
async fn bound_key_without_hwid_reports_stored_binding() {
    let store = MemoryKeyStore::new();
    let key = create_key(&store, "Bound", None).await;
    key_service::verify_key(&store, &key.key, Some("HW-A")).await;

    let result = key_service::verify_key(&store, &key.key, None).await;
    assert_eq!(
        result,
        Verification::Granted {
            label: Some("Bound".to_string()),
            expires_at: None,
            hwid: Some("HW-A".to_string()),
        }
    );
    assert_eq!(reload(&store, &key).await.active_hwid.as_deref(), Some("HW-A"));
}

#[tokio::test]
async fn clearing_expiration_makes_key_valid_again() {
    let store = MemoryKeyStore::new();
    let key = create_key(&store, "Renewed", Some(Utc::now() - Duration::days(1))).await;
    assert_eq!(
        key_service::verify_key(&store, &key.key, None).await,
        denied(DenyReason::Expired)
    );

    let changes = KeyChanges {
        expires_at: Some(None),
        ..KeyChanges::default()
    };
    let updated = key_service::update_key(&store, &key.id.to_string(), changes)
        .await
        .unwrap();
    assert_eq!(updated.expires_at, None);

    let far_future = Utc::now() + Duration::days(365 * 100);
    let result = key_service::verify_key_at(&store, &key.key, None, far_future).await;
    assert!(result.is_valid());
}

#[tokio::test]
async fn clearing_hwid_allows_rebinding() {
    let store = MemoryKeyStore::new();
    let key = create_key(&store, "Moved", None).await;
    key_service::verify_key(&store, &key.key, Some("HW-OLD")).await;

    let changes = KeyChanges {
        hwid: Some(None),
        ..KeyChanges::default()
    };
    key_service::update_key(&store, &key.id.to_string(), changes)
        .await
        .unwrap();

    let result = key_service::verify_key(&store, &key.key, Some("HW-NEW")).await;
    assert!(result.is_valid());
    assert_eq!(reload(&store, &key).await.hwid.as_deref(), Some("HW-NEW"));
}

#[tokio::test]
async fn lookup_failure_reports_database_error() {
    let store = FlakyStore::new();
    let key = create_key(&store, "Offline", None).await;
    store.set_fail_reads(true);

    let result = key_service::verify_key(&store, &key.key, Some("HW-A")).await;
    assert_eq!(result, denied(DenyReason::DatabaseError));
}

#[tokio::test]
async fn failed_bind_reports_database_error() {
    let store = FlakyStore::new();
    let key = create_key(&store, "ReadOnly", None).await;
    store.set_fail_writes(true);

    let result = key_service::verify_key(&store, &key.key, Some("HW-A")).await;

    assert_eq!(result, denied(DenyReason::DatabaseError));
    assert_eq!(reload(&store, &key).await.hwid, None);
}

#[tokio::test]
async fn failed_last_seen_write_still_grants() {
    let store = FlakyStore::new();
    let key = create_key(&store, "Sticky", None).await;
    key_service::verify_key(&store, &key.key, Some("HW-A")).await;
    let seen = reload(&store, &key).await.last_seen;
    store.set_fail_writes(true);

    let result = key_service::verify_key(&store, &key.key, Some("HW-A")).await;

    assert!(result.is_valid());
    assert_eq!(reload(&store, &key).await.last_seen, seen);
}

#[tokio::test]
async fn concurrent_bind_loser_sees_mismatch() {
    let store = FlakyStore::new();
    let key = create_key(&store, "Contested", None).await;
    store.race_next_bind("HW-RIVAL");

    let result = key_service::verify_key(&store, &key.key, Some("HW-A")).await;

    assert_eq!(result, denied(DenyReason::HwidMismatch));
    assert_eq!(reload(&store, &key).await.hwid.as_deref(), Some("HW-RIVAL"));
}

#[tokio::test]
async fn concurrent_bind_to_same_hwid_still_grants() {
    let store = FlakyStore::new();
    let key = create_key(&store, "SameMachine", None).await;
    store.race_next_bind("HW-A");

    let result = key_service::verify_key(&store, &key.key, Some("HW-A")).await;

    assert!(result.is_valid());
    let after = reload(&store, &key).await;
    assert_eq!(after.hwid.as_deref(), Some("HW-A"));
    assert!(after.last_seen.is_some());
}
