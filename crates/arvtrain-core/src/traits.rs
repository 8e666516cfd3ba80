//! Collaborator traits for ground-truth data, progress persistence and
//! result logging.
//!
//! Implemented by the `arvtrain-store` crate. Methods return `anyhow::Result`;
//! the trainer maps failures onto [`AssessmentError`](crate::error::AssessmentError)
//! or logs and swallows them.

use async_trait::async_trait;

use crate::model::Dataset;
use crate::progression::ProgressRecord;
use crate::report::UnitSummary;

/// Supplies the ground-truth property collection.
#[async_trait]
pub trait PropertySource: Send + Sync {
    /// Human-readable source name (e.g. "file", "http").
    fn name(&self) -> &str;

    /// Load the full collection.
    async fn load(&self) -> anyhow::Result<Dataset>;
}

/// Stores one [`ProgressRecord`] per trainee.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// `Ok(None)` when the trainee has no record yet.
    async fn load(&self, trainee: &str) -> anyhow::Result<Option<ProgressRecord>>;

    async fn save(&self, trainee: &str, record: &ProgressRecord) -> anyhow::Result<()>;
}

/// Receives one summary per completed unit.
#[async_trait]
pub trait ResultSink: Send + Sync {
    fn name(&self) -> &str;

    async fn append(&self, summary: &UnitSummary) -> anyhow::Result<()>;
}

/// Normalize a trainee identifier (usually an email) for use as a key.
pub fn trainee_key(trainee: &str) -> String {
    trainee.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trainee_keys_are_case_insensitive() {
        assert_eq!(trainee_key("  Ann@Example.COM "), "ann@example.com");
    }
}
