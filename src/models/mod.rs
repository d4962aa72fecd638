//! Data models representing store entities and API payloads.

/// License key record and management payloads
pub mod key;
/// Request body timestamp parsing
pub mod timestamp;
/// Verification request and result
pub mod verification;

