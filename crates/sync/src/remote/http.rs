//! HTTP client for the remote persistence API.
//!
//! # Endpoints
//!
//! All paths are relative to the configured base URL:
//!
//! - `GET    users/{user}/{kind}/items` - list (`{"items": [...]}`)
//! - `DELETE users/{user}/{kind}/items` - clear
//! - `PUT    users/{user}/{kind}/items/{item}` - upsert (body: item record)
//! - `DELETE users/{user}/{kind}/items/{item}` - delete
//!
//! A 404 on list means the collection was never written and is treated as
//! empty; a 404 on delete means the record is already gone.

use async_trait::async_trait;
use carryover_core::{CollectionKind, ItemId, ItemRecord, UserId};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{RemoteError, RemoteStore};
use crate::config::RemoteConfig;

/// List response envelope.
#[derive(Debug, Deserialize)]
struct ListResponse {
    items: Vec<ItemRecord>,
}

/// Remote store backed by the REST-like persistence API.
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRemoteStore {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();

        let mut auth_value = HeaderValue::from_str(&config.bearer())
            .map_err(|e| RemoteError::Unavailable(format!("Invalid token format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn items_url(&self, kind: CollectionKind, user: UserId) -> Result<Url, RemoteError> {
        Ok(self
            .base_url
            .join(&format!("users/{user}/{}/items", kind.as_str()))?)
    }

    fn item_url(
        &self,
        kind: CollectionKind,
        user: UserId,
        item: ItemId,
    ) -> Result<Url, RemoteError> {
        Ok(self
            .base_url
            .join(&format!("users/{user}/{}/items/{item}", kind.as_str()))?)
    }

    /// Turn a non-success response into `RemoteError::Api`.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(RemoteError::Api {
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    #[instrument(skip(self), fields(kind = %kind, user = %user))]
    async fn list(
        &self,
        kind: CollectionKind,
        user: UserId,
    ) -> Result<Vec<ItemRecord>, RemoteError> {
        let response = self.client.get(self.items_url(kind, user)?).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Remote collection not found, treating as empty");
            return Ok(Vec::new());
        }

        let body = Self::check(response).await?.text().await?;
        let parsed: ListResponse = serde_json::from_str(&body)?;
        Ok(parsed.items)
    }

    #[instrument(skip(self, record), fields(kind = %kind, user = %user, item = %record.item_id))]
    async fn upsert(
        &self,
        kind: CollectionKind,
        user: UserId,
        record: &ItemRecord,
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .put(self.item_url(kind, user, record.item_id)?)
            .json(record)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(kind = %kind, user = %user, item = %item))]
    async fn delete(
        &self,
        kind: CollectionKind,
        user: UserId,
        item: ItemId,
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.item_url(kind, user, item)?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }

        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(kind = %kind, user = %user))]
    async fn clear(&self, kind: CollectionKind, user: UserId) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.items_url(kind, user)?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }

        Self::check(response).await?;
        Ok(())
    }
}
