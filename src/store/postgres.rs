//! PostgreSQL key store.
//!
//! Filters and sparse updates are assembled with `sqlx::QueryBuilder` so every
//! value travels as a bind parameter.

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{KeyFilter, KeyStore, StoreError};
use crate::db::DbPool;
use crate::models::key::{KeyChanges, LicenseKey, NewKey};

/// Column list shared by every statement that returns rows.
const COLUMNS: &str =
    r#"id, "key", label, enabled, hwid, active_hwid, expires_at, last_seen, created_at"#;

pub struct PgKeyStore {
    pool: DbPool,
}

impl PgKeyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Append a `WHERE` clause for `filter`; nothing is appended for the empty filter.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &KeyFilter) {
    let mut glue = " WHERE ";

    if let Some(id) = filter.id {
        builder.push(glue).push("id = ").push_bind(id);
        glue = " AND ";
    }
    if let Some(key) = &filter.key {
        builder.push(glue).push(r#""key" = "#).push_bind(key.clone());
        glue = " AND ";
    }
    if filter.hwid_unbound {
        builder.push(glue).push("hwid IS NULL");
    }
}

/// Append the `SET` list for `changes`. Caller guarantees `changes` is not empty.
fn push_assignments(builder: &mut QueryBuilder<'_, Postgres>, changes: &KeyChanges) {
    let mut set = builder.separated(", ");

    if let Some(enabled) = changes.enabled {
        set.push("enabled = ").push_bind_unseparated(enabled);
    }
    if let Some(label) = &changes.label {
        set.push("label = ").push_bind_unseparated(label.clone());
    }
    if let Some(expires_at) = changes.expires_at {
        set.push("expires_at = ").push_bind_unseparated(expires_at);
    }
    if let Some(hwid) = &changes.hwid {
        set.push("hwid = ").push_bind_unseparated(hwid.clone());
    }
    if let Some(active_hwid) = &changes.active_hwid {
        set.push("active_hwid = ")
            .push_bind_unseparated(active_hwid.clone());
    }
    if let Some(last_seen) = changes.last_seen {
        set.push("last_seen = ").push_bind_unseparated(last_seen);
    }
}

#[async_trait]
impl KeyStore for PgKeyStore {
    async fn find(&self, filter: &KeyFilter) -> Result<Vec<LicenseKey>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(COLUMNS).push(" FROM keys");
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC");

        let rows = builder
            .build_query_as::<LicenseKey>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn insert(&self, key: NewKey) -> Result<LicenseKey, StoreError> {
        let result = sqlx::query_as::<_, LicenseKey>(&format!(
            r#"
            INSERT INTO keys ("key", label, enabled, hwid, expires_at, last_seen, active_hwid)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&key.key)
        .bind(&key.label)
        .bind(key.enabled)
        .bind(&key.hwid)
        .bind(key.expires_at)
        .bind(key.last_seen)
        .bind(&key.active_hwid)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row),
            // Token collisions surface as a unique violation on "key"
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(StoreError::Duplicate(key.key))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_where(
        &self,
        filter: &KeyFilter,
        changes: &KeyChanges,
    ) -> Result<Vec<LicenseKey>, StoreError> {
        if changes.is_empty() {
            return self.find(filter).await;
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE keys SET ");
        push_assignments(&mut builder, changes);
        push_filter(&mut builder, filter);
        builder.push(" RETURNING ").push(COLUMNS);

        let rows = builder
            .build_query_as::<LicenseKey>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn delete_where(&self, filter: &KeyFilter) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("DELETE FROM keys");
        push_filter(&mut builder, filter);

        let result = builder.build().execute(&self.pool).await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
