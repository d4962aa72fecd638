//! Supabase / PostgREST key store.
//!
//! Every operation is one HTTP round-trip against `{base}/rest/v1/keys`.
//! Filters are expressed as PostgREST query operators (`id=eq.…`, `hwid=is.null`)
//! and writes ask for `Prefer: return=representation` so the affected rows come back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use url::Url;

use super::{KeyFilter, KeyStore, StoreError};
use crate::models::key::{KeyChanges, LicenseKey, NewKey};

const RETURN_REPRESENTATION: &str = "return=representation";

pub struct RestKeyStore {
    client: reqwest::Client,
    table_url: Url,
    service_key: String,
}

impl RestKeyStore {
    /// Build a client for the project at `base_url`.
    ///
    /// `timeout` bounds every request, including connection setup.
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            table_url: table_url(base_url)?,
            service_key: service_key.to_string(),
        })
    }

    fn request(&self, method: Method, filter: &KeyFilter) -> RequestBuilder {
        self.client
            .request(method, self.table_url.clone())
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .query(&filter_params(filter))
    }
}

/// Resolve the `keys` endpoint, tolerating a base URL with or without a trailing slash.
fn table_url(base_url: &str) -> Result<Url, StoreError> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join("rest/v1/keys")?)
}

/// PostgREST query parameters for `filter`.
fn filter_params(filter: &KeyFilter) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    if let Some(id) = filter.id {
        params.push(("id", format!("eq.{id}")));
    }
    if let Some(key) = &filter.key {
        params.push(("key", format!("eq.{key}")));
    }
    if filter.hwid_unbound {
        params.push(("hwid", "is.null".to_string()));
    }

    params
}

/// Turn a non-2xx response into [`StoreError::Status`].
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl KeyStore for RestKeyStore {
    async fn find(&self, filter: &KeyFilter) -> Result<Vec<LicenseKey>, StoreError> {
        let response = self
            .request(Method::GET, filter)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    async fn insert(&self, key: NewKey) -> Result<LicenseKey, StoreError> {
        let response = self
            .request(Method::POST, &KeyFilter::all())
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&key)
            .send()
            .await?;

        // PostgREST reports unique violations as 409 Conflict
        if response.status() == StatusCode::CONFLICT {
            return Err(StoreError::Duplicate(key.key));
        }

        let rows: Vec<LicenseKey> = check(response).await?.json().await?;
        rows.into_iter().next().ok_or(StoreError::EmptyInsert)
    }

    async fn update_where(
        &self,
        filter: &KeyFilter,
        changes: &KeyChanges,
    ) -> Result<Vec<LicenseKey>, StoreError> {
        if changes.is_empty() {
            return self.find(filter).await;
        }

        let response = self
            .request(Method::PATCH, filter)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(changes)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    async fn delete_where(&self, filter: &KeyFilter) -> Result<u64, StoreError> {
        let response = self
            .request(Method::DELETE, filter)
            .header("Prefer", RETURN_REPRESENTATION)
            .send()
            .await?;

        let rows: Vec<LicenseKey> = check(response).await?.json().await?;
        Ok(rows.len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let response = self
            .request(Method::GET, &KeyFilter::all())
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}
