//! Remote store backed by the flashcards backend over HTTP.

use super::RemoteStore;
use crate::config::SyncConfig;
use crate::error::SyncError;
use async_trait::async_trait;
use flashcard_core::types::{Collection, Snapshot};
use reqwest::{Client, Response};
use std::time::Duration;

/// HTTP client for one account's documents.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    backend_url: String,
    account_id: String,
}

impl HttpRemoteStore {
    pub fn new(backend_url: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.backend_url.clone(), config.account_id.clone())
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    fn account_url(&self, path: &str) -> String {
        format!(
            "{}/api/accounts/{}/{}",
            self.backend_url, self.account_id, path
        )
    }

    async fn check(resp: Response) -> Result<Response, SyncError> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(SyncError::Backend { status, message });
        }
        Ok(resp)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn get_snapshot(&self) -> Result<Snapshot, SyncError> {
        let resp = self
            .client
            .get(self.account_url("snapshot"))
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), SyncError> {
        let resp = self
            .client
            .put(self.account_url("snapshot"))
            .json(snapshot)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Self::check(resp).await?;
        Ok(())
    }

    async fn save_collection(&self, collection: &Collection) -> Result<(), SyncError> {
        let resp = self
            .client
            .put(self.account_url(collection.kind().as_str()))
            .json(collection)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Self::check(resp).await?;
        Ok(())
    }

    async fn probe_connectivity(&self, timeout: Duration) -> bool {
        let url = format!("{}/health", self.backend_url);
        match self.client.get(&url).timeout(timeout).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "connectivity probe failed");
                false
            }
        }
    }
}
