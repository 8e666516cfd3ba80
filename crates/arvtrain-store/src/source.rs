//! Ground-truth property sources.
//!
//! Both sources fetch once and serve the cached dataset afterwards. A failed
//! fetch is not cached, so the next call tries again.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::instrument;

use arvtrain_core::model::Dataset;
use arvtrain_core::traits::PropertySource;

use crate::error::StoreError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Properties read from a local JSON array.
pub struct JsonFileSource {
    path: PathBuf,
    cache: OnceCell<Dataset>,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    async fn fetch(&self) -> Result<Dataset, StoreError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        let dataset: Dataset =
            serde_json::from_str(&content).map_err(|e| StoreError::corrupt(&self.path, e))?;
        tracing::info!(path = %self.path.display(), properties = dataset.len(), "loaded properties");
        Ok(dataset)
    }
}

#[async_trait]
impl PropertySource for JsonFileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self) -> anyhow::Result<Dataset> {
        let dataset = self.cache.get_or_try_init(|| self.fetch()).await?;
        Ok(dataset.clone())
    }
}

/// Properties fetched from an HTTP endpoint returning a JSON array.
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
    cache: OnceCell<Dataset>,
}

impl HttpSource {
    pub fn new(url: &str, timeout_secs: Option<u64>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            url: url.to_string(),
            client,
            cache: OnceCell::new(),
        })
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Dataset, StoreError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| StoreError::from_reqwest(e, &self.url))?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(StoreError::NotFound(self.url.clone()));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                status,
                message: body,
            });
        }

        let dataset: Dataset = response.json().await.map_err(|e| StoreError::Http {
            status,
            message: format!("failed to parse properties: {e}"),
        })?;
        tracing::info!(properties = dataset.len(), "loaded properties");
        Ok(dataset)
    }
}

#[async_trait]
impl PropertySource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn load(&self) -> anyhow::Result<Dataset> {
        let dataset = self.cache.get_or_try_init(|| self.fetch()).await?;
        Ok(dataset.clone())
    }
}
