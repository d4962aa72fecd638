//! Verification request and result types.
//!
//! Verification is the public contract used by deployed applications, so every
//! outcome (including store failures) is expressed as a `Verification` value and
//! sent with HTTP 200.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

/// Request body for `POST /api/verify`.
///
/// ```json
/// { "key": "AbCdEfGh12345678", "hwid": "machine-fingerprint" }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub hwid: Option<String>,
}

/// Why a key failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DenyReason {
    #[serde(rename = "Key not found")]
    NotFound,

    #[serde(rename = "Key is disabled")]
    Disabled,

    #[serde(rename = "Key has expired")]
    Expired,

    #[serde(rename = "HWID mismatch")]
    HwidMismatch,

    #[serde(rename = "Database error")]
    DatabaseError,

    #[serde(rename = "Invalid request")]
    InvalidRequest,
}

/// Outcome of verifying a key.
///
/// # JSON
///
/// ```json
/// { "valid": false, "reason": "HWID mismatch" }
/// { "valid": true, "label": "Customer #42", "expires_at": null, "hwid": "machine-fingerprint" }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Granted {
        label: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        hwid: Option<String>,
    },
    Denied(DenyReason),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Granted { .. })
    }
}

impl From<DenyReason> for Verification {
    fn from(reason: DenyReason) -> Self {
        Verification::Denied(reason)
    }
}

impl Serialize for Verification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Verification::Granted {
                label,
                expires_at,
                hwid,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("valid", &true)?;
                map.serialize_entry("label", label)?;
                map.serialize_entry("expires_at", expires_at)?;
                map.serialize_entry("hwid", hwid)?;
                map.end()
            }
            Verification::Denied(reason) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("valid", &false)?;
                map.serialize_entry("reason", reason)?;
                map.end()
            }
        }
    }
}
