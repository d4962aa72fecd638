//! Key lifecycle service - core business logic for license keys.
//!
//! This service handles:
//! - Key token generation
//! - Create / list / update / delete for the dashboard
//! - The verification state machine used by client applications
//!
//! # Verification Order
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. key exists
//! 2. key is enabled
//! 3. key is not expired
//! 4. supplied HWID matches the bound one, or binds an unbound key
//!
//! Nothing is written unless every check passes.

use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        key::{CreateKeyRequest, KeyChanges, LicenseKey, NewKey, mask_token},
        verification::{DenyReason, Verification},
    },
    store::{KeyFilter, KeyStore, StoreError},
};

/// Length of generated key tokens.
pub const KEY_LENGTH: usize = 16;

/// Generate a key token of [`KEY_LENGTH`] characters from `[A-Za-z0-9]`.
///
/// Uniqueness is left to the store; with 62^16 possible tokens a collision
/// surfaces as a failed insert rather than being retried.
pub fn generate_key_token() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// Issue a new key.
///
/// # Process
///
/// 1. Generate a random token
/// 2. Insert it enabled, unbound and never seen
/// 3. Return the stored row with its store-assigned `id` and `created_at`
///
/// # Errors
///
/// - `Store`: insert failed, including a token collision
pub async fn create_key(
    store: &dyn KeyStore,
    request: CreateKeyRequest,
) -> Result<LicenseKey, AppError> {
    let new_key = NewKey::new(
        generate_key_token(),
        request.label.unwrap_or_else(|| Some(String::new())),
        request.expires_at,
    );

    let key = store.insert(new_key).await?;
    tracing::info!(key_id = %key.id, key = %key.masked_key(), "License key created");

    Ok(key)
}

/// All keys, newest first.
pub async fn list_keys(store: &dyn KeyStore) -> Result<Vec<LicenseKey>, AppError> {
    Ok(store.find(&KeyFilter::all()).await?)
}

/// Apply a sparse update to the key with `id`.
///
/// An empty change set returns the key unchanged.
///
/// # Errors
///
/// - `KeyNotFound`: no key has this id (ids that are not UUIDs never match)
/// - `Store`: update failed
pub async fn update_key(
    store: &dyn KeyStore,
    id: &str,
    changes: KeyChanges,
) -> Result<LicenseKey, AppError> {
    let id = Uuid::parse_str(id).map_err(|_| AppError::KeyNotFound)?;

    let key = store
        .update_where(&KeyFilter::by_id(id), &changes)
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::KeyNotFound)?;

    tracing::info!(key_id = %key.id, ?changes, "License key updated");
    Ok(key)
}

/// Hard-delete the key with `id`.
///
/// Deleting a key that does not exist is not an error.
pub async fn delete_key(store: &dyn KeyStore, id: &str) -> Result<(), AppError> {
    let Ok(id) = Uuid::parse_str(id) else {
        return Ok(());
    };

    let removed = store.delete_where(&KeyFilter::by_id(id)).await?;
    tracing::info!(key_id = %id, removed, "License key deleted");

    Ok(())
}

/// Verify `token` against the current time.
///
/// Never fails: store errors become [`DenyReason::DatabaseError`].
pub async fn verify_key(store: &dyn KeyStore, token: &str, hwid: Option<&str>) -> Verification {
    verify_key_at(store, token, hwid, Utc::now()).await
}

/// Verify `token` as of `now`.
///
/// An empty `hwid` is treated as absent.
pub async fn verify_key_at(
    store: &dyn KeyStore,
    token: &str,
    hwid: Option<&str>,
    now: DateTime<Utc>,
) -> Verification {
    let hwid = hwid.filter(|hwid| !hwid.is_empty());

    let verification = match evaluate(store, token, hwid, now).await {
        Ok(verification) => verification,
        Err(err) => {
            tracing::error!("Verification aborted by key store failure: {}", err);
            DenyReason::DatabaseError.into()
        }
    };

    if let Verification::Denied(reason) = &verification {
        tracing::debug!(key = %mask_token(token), ?reason, "Verification denied");
    }

    verification
}

async fn evaluate(
    store: &dyn KeyStore,
    token: &str,
    hwid: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Verification, StoreError> {
    let Some(key) = store
        .find(&KeyFilter::by_key(token))
        .await?
        .into_iter()
        .next()
    else {
        return Ok(DenyReason::NotFound.into());
    };

    if !key.enabled {
        return Ok(DenyReason::Disabled.into());
    }

    if key.is_expired_at(now) {
        return Ok(DenyReason::Expired.into());
    }

    if let Some(supplied) = hwid {
        match key.hwid.as_deref() {
            Some(stored) if stored != supplied => return Ok(DenyReason::HwidMismatch.into()),
            Some(_) => {}
            None => return bind_first_use(store, key, supplied, now).await,
        }
    }

    Ok(record_seen(store, key, hwid, now).await)
}

/// Lock an unbound key to `supplied`.
///
/// The bind is a conditional write on `hwid IS NULL` that also records the
/// sighting, so two machines racing for the same key cannot both win.
async fn bind_first_use(
    store: &dyn KeyStore,
    key: LicenseKey,
    supplied: &str,
    now: DateTime<Utc>,
) -> Result<Verification, StoreError> {
    let changes =
        KeyChanges::seen(now, Some(supplied.to_string())).with_hwid(supplied.to_string());

    let bound = store
        .update_where(&KeyFilter::by_id(key.id).unbound(), &changes)
        .await?;

    if let Some(row) = bound.into_iter().next() {
        tracing::info!(key_id = %row.id, hwid = supplied, "License key bound to hardware id");
        return Ok(granted(row, None));
    }

    // Lost the race: the key was bound (or removed) after our lookup
    let Some(current) = store
        .find(&KeyFilter::by_id(key.id))
        .await?
        .into_iter()
        .next()
    else {
        return Ok(DenyReason::NotFound.into());
    };

    if current.hwid.as_deref() == Some(supplied) {
        Ok(record_seen(store, current, Some(supplied), now).await)
    } else {
        Ok(DenyReason::HwidMismatch.into())
    }
}

/// Success path: stamp `last_seen`/`active_hwid` and grant.
///
/// A failed write-back is logged and the key is still reported valid; every
/// check already passed against the row we read.
async fn record_seen(
    store: &dyn KeyStore,
    key: LicenseKey,
    hwid: Option<&str>,
    now: DateTime<Utc>,
) -> Verification {
    let active_hwid = hwid.map(str::to_string).or_else(|| key.hwid.clone());

    if let Err(err) = store
        .update_where(&KeyFilter::by_id(key.id), &KeyChanges::seen(now, active_hwid))
        .await
    {
        tracing::warn!(key_id = %key.id, "Failed to record last_seen: {}", err);
    }

    granted(key, hwid)
}

fn granted(key: LicenseKey, supplied: Option<&str>) -> Verification {
    Verification::Granted {
        label: key.label,
        expires_at: key.expires_at,
        hwid: key.hwid.or_else(|| supplied.map(str::to_string)),
    }
}
