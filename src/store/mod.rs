//! Key store abstraction.
//!
//! The lifecycle engine talks to the `keys` table only through the four
//! filter-based operations of [`KeyStore`]. Three backends implement it:
//! - [`PgKeyStore`]: PostgreSQL through sqlx
//! - [`RestKeyStore`]: Supabase / PostgREST over HTTP
//! - [`MemoryKeyStore`]: in-process map for development and tests

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::key::{KeyChanges, LicenseKey, NewKey};

pub mod memory;
pub mod postgres;
pub mod rest;

pub use memory::MemoryKeyStore;
pub use postgres::PgKeyStore;
pub use rest::RestKeyStore;

/// Shared handle injected into handlers.
pub type SharedKeyStore = Arc<dyn KeyStore>;

/// Errors raised by a key store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("a key with token {0} already exists")]
    Duplicate(String),

    #[error("store returned no row for insert")]
    EmptyInsert,

    #[error("invalid store url: {0}")]
    Url(#[from] url::ParseError),
}

/// Row filter. Every populated condition must hold (logical AND).
///
/// The default filter matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFilter {
    pub id: Option<Uuid>,
    pub key: Option<String>,
    /// Only rows whose `hwid` is NULL.
    pub hwid_unbound: bool,
}

impl KeyFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// Narrow the filter to keys that are not bound to a machine yet.
    pub fn unbound(mut self) -> Self {
        self.hwid_unbound = true;
        self
    }

    pub fn matches(&self, row: &LicenseKey) -> bool {
        self.id.is_none_or(|id| row.id == id)
            && self.key.as_deref().is_none_or(|key| row.key == key)
            && (!self.hwid_unbound || row.hwid.is_none())
    }
}

/// Persistence operations over the `keys` table.
///
/// Calls are single round-trips with no retry.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Rows matching `filter`, newest `created_at` first.
    async fn find(&self, filter: &KeyFilter) -> Result<Vec<LicenseKey>, StoreError>;

    /// Insert a key and return the stored row with its assigned `id` and `created_at`.
    ///
    /// Fails with [`StoreError::Duplicate`] when the token is already taken.
    async fn insert(&self, key: NewKey) -> Result<LicenseKey, StoreError>;

    /// Apply `changes` to every row matching `filter` and return the updated rows.
    ///
    /// The filter is evaluated atomically with the write, so a filter such as
    /// `KeyFilter::by_id(id).unbound()` acts as a compare-and-set. An empty
    /// change set returns the matching rows unchanged.
    async fn update_where(
        &self,
        filter: &KeyFilter,
        changes: &KeyChanges,
    ) -> Result<Vec<LicenseKey>, StoreError>;

    /// Delete every row matching `filter`, returning how many were removed.
    async fn delete_where(&self, filter: &KeyFilter) -> Result<u64, StoreError>;

    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
