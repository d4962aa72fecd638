//! License key model and management request types.
//!
//! This module defines:
//! - `LicenseKey`: a row of the `keys` table
//! - `NewKey`: the record written on creation
//! - `KeyChanges`: a sparse set of column updates, shared by management and verification
//! - `CreateKeyRequest` / `UpdateKeyRequest`: dashboard request bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp::{
    deserialize_optional_timestamp, deserialize_patch_clearable, deserialize_patch_text,
    deserialize_patch_timestamp,
};

/// Represents a license key record from the store.
///
/// # Database Table
///
/// Maps to the `keys` table. The same shape is returned verbatim to the dashboard.
///
/// # HWID Binding
///
/// `hwid` is the machine the key is locked to. A key with no `hwid` locks itself
/// to the first machine that verifies it; after that only a management update
/// can clear or change the binding.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct LicenseKey {
    /// Store-assigned identifier
    pub id: Uuid,

    /// The credential handed to customers (16 alphanumeric characters)
    pub key: String,

    /// Free-text description shown in the dashboard
    pub label: Option<String>,

    /// Disabled keys never verify
    pub enabled: bool,

    /// Hardware identifier the key is bound to
    pub hwid: Option<String>,

    /// Hardware identifier seen on the most recent successful verification
    pub active_hwid: Option<String>,

    /// After this instant verification fails; `None` never expires
    pub expires_at: Option<DateTime<Utc>>,

    /// Last successful verification
    pub last_seen: Option<DateTime<Utc>>,

    /// Store-assigned creation time
    pub created_at: DateTime<Utc>,
}

impl LicenseKey {
    /// Whether the key is past its expiration at `now`.
    ///
    /// The expiration instant itself still counts as valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// Key token with everything but the first four characters masked, for logs.
    pub fn masked_key(&self) -> String {
        mask_token(&self.key)
    }
}

/// Mask a key token for log output.
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{visible}****")
}

/// A key about to be inserted.
///
/// `id` and `created_at` are assigned by the store; the binding and
/// last-seen columns start out empty.
#[derive(Debug, Clone, Serialize)]
pub struct NewKey {
    pub key: String,
    pub label: Option<String>,
    pub enabled: bool,
    pub hwid: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub active_hwid: Option<String>,
}

impl NewKey {
    pub fn new(key: String, label: Option<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            key,
            label,
            enabled: true,
            hwid: None,
            expires_at,
            last_seen: None,
            active_hwid: None,
        }
    }
}

/// A sparse update of a key.
///
/// `None` leaves a column untouched. For nullable columns, `Some(None)` writes
/// NULL. Serializes to exactly the present columns, which is the body a REST
/// store expects for a partial update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Option<DateTime<Utc>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hwid: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_hwid: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl KeyChanges {
    /// Changes recorded by a successful verification.
    pub fn seen(now: DateTime<Utc>, active_hwid: Option<String>) -> Self {
        Self {
            last_seen: Some(now),
            active_hwid: Some(active_hwid),
            ..Self::default()
        }
    }

    /// Add a hardware binding to this change set.
    pub fn with_hwid(mut self, hwid: String) -> Self {
        self.hwid = Some(Some(hwid));
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the present fields to `key`, leaving the rest untouched.
    pub fn apply_to(&self, key: &mut LicenseKey) {
        if let Some(enabled) = self.enabled {
            key.enabled = enabled;
        }
        if let Some(label) = &self.label {
            key.label = label.clone();
        }
        if let Some(expires_at) = self.expires_at {
            key.expires_at = expires_at;
        }
        if let Some(hwid) = &self.hwid {
            key.hwid = hwid.clone();
        }
        if let Some(active_hwid) = &self.active_hwid {
            key.active_hwid = active_hwid.clone();
        }
        if let Some(last_seen) = self.last_seen {
            key.last_seen = Some(last_seen);
        }
    }
}

/// Request body for creating a key.
///
/// # JSON Example
///
/// ```json
/// {
///   "label": "Customer #42",
///   "expires_at": "2026-01-01T00:00:00Z"
/// }
/// ```
///
/// Both fields are optional; an empty `expires_at` means the key never expires.
/// An absent `label` is stored as `""` while an explicit `null` stays null.
#[derive(Debug, Default, Deserialize)]
pub struct CreateKeyRequest {
    #[serde(default, deserialize_with = "deserialize_patch_text")]
    pub label: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request body for `PATCH /api/keys/{id}`.
///
/// Only the fields present in the body are changed. `expires_at` and `hwid`
/// are cleared by either `null` or `""`; `label` is cleared by `null` only.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateKeyRequest {
    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_patch_timestamp")]
    pub expires_at: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "deserialize_patch_text")]
    pub label: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_patch_clearable")]
    pub hwid: Option<Option<String>>,
}

impl From<UpdateKeyRequest> for KeyChanges {
    fn from(request: UpdateKeyRequest) -> Self {
        Self {
            enabled: request.enabled,
            label: request.label,
            expires_at: request.expires_at,
            hwid: request.hwid,
            ..Self::default()
        }
    }
}
