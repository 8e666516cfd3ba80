//! Result sinks: where completed unit summaries are sent.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

use arvtrain_core::report::UnitSummary;
use arvtrain_core::traits::ResultSink;

use crate::error::StoreError;

const WEBHOOK_TIMEOUT_SECS: u64 = 15;

/// POSTs each summary as JSON to a webhook (e.g. a spreadsheet script).
pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl ResultSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    #[instrument(skip(self, summary), fields(trainee = %summary.trainee, unit = summary.unit_index))]
    async fn append(&self, summary: &UnitSummary) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(summary)
            .send()
            .await
            .map_err(|e| StoreError::from_reqwest(e, &self.url))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                status,
                message: body,
            }
            .into());
        }
        tracing::debug!(status, "summary delivered");
        Ok(())
    }
}

/// Appends one JSON object per line to a local file.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ResultSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn append(&self, summary: &UnitSummary) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        let mut line = serde_json::to_string(summary)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.flush().await.map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

/// Discards every summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl ResultSink for NullSink {
    fn name(&self) -> &str {
        "none"
    }

    async fn append(&self, _summary: &UnitSummary) -> anyhow::Result<()> {
        Ok(())
    }
}
