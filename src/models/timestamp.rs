//! Timestamp parsing for request bodies.
//!
//! Dashboards send expiration dates in a few shapes. Everything is normalized to UTC:
//! - RFC 3339 (`2025-06-30T12:00:00Z`, `2025-06-30T12:00:00+02:00`)
//! - naive date-time (`2025-06-30T12:00:00`), taken as UTC
//! - bare date (`2025-06-30`), taken as midnight UTC

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, de};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp `{0}`")]
pub struct InvalidTimestamp(pub String);

/// Parse a timestamp in any of the accepted shapes.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, InvalidTimestamp> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(InvalidTimestamp(raw.to_string()))
}

/// `null`, absent and `""` all mean "no timestamp".
pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_timestamp(value).map(Some).map_err(de::Error::custom),
    }
}

/// Patch variant: the outer `Option` records whether the field was present at all.
///
/// Must be paired with `#[serde(default)]` so an absent field stays `None`.
pub fn deserialize_patch_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_timestamp(deserializer).map(Some)
}

/// Patch field where `null` and `""` both clear the column.
pub fn deserialize_patch_clearable<'de, D>(
    deserializer: D,
) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(Some(raw.filter(|value| !value.is_empty())))
}

/// Patch field where `null` clears the column and any string is kept verbatim.
pub fn deserialize_patch_text<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
