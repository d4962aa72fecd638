//! In-memory key store for development and tests.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use super::{KeyFilter, KeyStore, StoreError};
use crate::models::key::{KeyChanges, LicenseKey, NewKey};

/// Keys held in a `DashMap`, plus a token index that enforces uniqueness.
///
/// `created_at` is strictly increasing across inserts so "newest first"
/// ordering stays stable even for keys created within the same microsecond.
pub struct MemoryKeyStore {
    rows: DashMap<Uuid, LicenseKey>,
    tokens: DashMap<String, Uuid>,
    last_created_micros: AtomicI64,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            tokens: DashMap::new(),
            last_created_micros: AtomicI64::new(i64::MIN),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn next_created_at(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let previous = self
            .last_created_micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or(now);
        let assigned = now.max(previous.saturating_add(1));

        DateTime::from_timestamp_micros(assigned).unwrap_or_else(Utc::now)
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn find(&self, filter: &KeyFilter) -> Result<Vec<LicenseKey>, StoreError> {
        let mut rows: Vec<LicenseKey> = self
            .rows
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert(&self, key: NewKey) -> Result<LicenseKey, StoreError> {
        let id = Uuid::new_v4();

        match self.tokens.entry(key.key.clone()) {
            Entry::Occupied(_) => return Err(StoreError::Duplicate(key.key)),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let row = LicenseKey {
            id,
            key: key.key,
            label: key.label,
            enabled: key.enabled,
            hwid: key.hwid,
            active_hwid: key.active_hwid,
            expires_at: key.expires_at,
            last_seen: key.last_seen,
            created_at: self.next_created_at(),
        };
        self.rows.insert(id, row.clone());

        Ok(row)
    }

    async fn update_where(
        &self,
        filter: &KeyFilter,
        changes: &KeyChanges,
    ) -> Result<Vec<LicenseKey>, StoreError> {
        let mut updated = Vec::new();

        // The shard write lock is held while each row is matched and changed
        for mut entry in self.rows.iter_mut() {
            if filter.matches(entry.value()) {
                changes.apply_to(entry.value_mut());
                updated.push(entry.value().clone());
            }
        }

        updated.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(updated)
    }

    async fn delete_where(&self, filter: &KeyFilter) -> Result<u64, StoreError> {
        let doomed: Vec<Uuid> = self
            .rows
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for id in doomed {
            if let Some((_, row)) = self.rows.remove(&id) {
                self.tokens.remove(&row.key);
                removed += 1;
            }
        }

        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
