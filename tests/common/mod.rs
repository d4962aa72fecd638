//! Shared test helpers for key store and HTTP tests.

#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use license_key_server::{
    AppState, build_router,
    models::key::{CreateKeyRequest, KeyChanges, LicenseKey, NewKey},
    services::key_service,
    store::{KeyFilter, KeyStore, MemoryKeyStore, SharedKeyStore, StoreError},
};

pub const TEST_PASSWORD: &str = "test-password";

/// Memory store wrapper that counts writes and can be told to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryKeyStore,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// When set, the next conditional bind is preceded by a competing bind to this hwid.
    competing_bind: Mutex<Option<String>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn race_next_bind(&self, hwid: &str) {
        *self.competing_bind.lock().unwrap() = Some(hwid.to_string());
    }

    fn unavailable() -> StoreError {
        StoreError::Status {
            status: 503,
            body: "store unavailable".to_string(),
        }
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl KeyStore for FlakyStore {
    async fn find(&self, filter: &KeyFilter) -> Result<Vec<LicenseKey>, StoreError> {
        self.check_read()?;
        self.inner.find(filter).await
    }

    async fn insert(&self, key: NewKey) -> Result<LicenseKey, StoreError> {
        self.check_write()?;
        self.inner.insert(key).await
    }

    async fn update_where(
        &self,
        filter: &KeyFilter,
        changes: &KeyChanges,
    ) -> Result<Vec<LicenseKey>, StoreError> {
        self.check_write()?;

        let competing = self.competing_bind.lock().unwrap().take();
        if let (true, Some(hwid)) = (filter.hwid_unbound, competing) {
            let rival = KeyChanges::default().with_hwid(hwid);
            self.inner.update_where(filter, &rival).await?;
        }

        self.inner.update_where(filter, changes).await
    }

    async fn delete_where(&self, filter: &KeyFilter) -> Result<u64, StoreError> {
        self.check_write()?;
        self.inner.delete_where(filter).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_read()
    }
}

/// Create a key with `label` and optional expiration directly through the service.
pub async fn create_key(
    store: &dyn KeyStore,
    label: &str,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
) -> LicenseKey {
    key_service::create_key(
        store,
        CreateKeyRequest {
            label: Some(Some(label.to_string())),
            expires_at,
        },
    )
    .await
    .unwrap()
}

/// Re-read a key by id.
pub async fn reload(store: &dyn KeyStore, key: &LicenseKey) -> LicenseKey {
    store
        .find(&KeyFilter::by_id(key.id))
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap()
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
pub async fn spawn_app(store: SharedKeyStore) -> String {
    let app = build_router(AppState::new(store, TEST_PASSWORD));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

/// Memory-backed server.
pub async fn spawn_memory_app() -> String {
    spawn_app(Arc::new(MemoryKeyStore::new())).await
}
