//! In-memory collaborators for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use arvtrain_core::model::Dataset;
use arvtrain_core::progression::ProgressRecord;
use arvtrain_core::report::UnitSummary;
use arvtrain_core::traits::{ProgressStore, PropertySource, ResultSink};

use crate::error::StoreError;

/// A property source over a fixed dataset.
pub struct MemorySource {
    dataset: Option<Dataset>,
    load_count: AtomicU32,
}

impl MemorySource {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Some(dataset),
            load_count: AtomicU32::new(0),
        }
    }

    /// A source whose data never loads.
    pub fn unavailable() -> Self {
        Self {
            dataset: None,
            load_count: AtomicU32::new(0),
        }
    }

    pub fn load_count(&self) -> u32 {
        self.load_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PropertySource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> anyhow::Result<Dataset> {
        self.load_count.fetch_add(1, Ordering::Relaxed);
        self.dataset
            .clone()
            .ok_or_else(|| StoreError::NotFound("in-memory dataset".into()).into())
    }
}

/// A progress store backed by a map, with switchable failure.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, ProgressRecord>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Insert a record directly, bypassing failure injection.
    pub fn insert(&self, trainee: &str, record: ProgressRecord) {
        self.lock().insert(trainee.to_string(), record);
    }

    pub fn get(&self, trainee: &str) -> Option<ProgressRecord> {
        self.lock().get(trainee).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ProgressRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(StoreError::Network("memory store set to fail".into()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn load(&self, trainee: &str) -> anyhow::Result<Option<ProgressRecord>> {
        self.check()?;
        Ok(self.get(trainee))
    }

    async fn save(&self, trainee: &str, record: &ProgressRecord) -> anyhow::Result<()> {
        self.check()?;
        self.insert(trainee, record.clone());
        Ok(())
    }
}

/// A sink that keeps every summary it receives.
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<UnitSummary>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn entries(&self) -> Vec<UnitSummary> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, summary: &UnitSummary) -> anyhow::Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(StoreError::Network("memory sink set to fail".into()).into());
        }
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(summary.clone());
        Ok(())
    }
}
