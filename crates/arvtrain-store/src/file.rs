//! JSON-file progress store: one file per trainee in a directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use arvtrain_core::progression::ProgressRecord;
use arvtrain_core::traits::ProgressStore;

use crate::error::StoreError;

/// Stores each trainee's record as `<dir>/<encoded id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `trainee`'s record.
    pub fn record_path(&self, trainee: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(trainee)))
    }
}

/// Encode an identifier as a file name.
///
/// Bytes outside `[a-z0-9._-]` become `%XX`, as does `%` itself and a
/// leading `.`, so distinct keys never share a file.
fn file_stem(trainee: &str) -> String {
    let key = trainee.trim().to_ascii_lowercase();
    if key.is_empty() {
        // no encoded key is a bare `%`
        return "%".to_string();
    }
    let mut stem = String::with_capacity(key.len());
    for (i, byte) in key.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'-' | b'_')
            || (byte == b'.' && i > 0);
        if keep {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

#[async_trait]
impl ProgressStore for JsonFileStore {
    async fn load(&self, trainee: &str) -> anyhow::Result<Option<ProgressRecord>> {
        let path = self.record_path(trainee);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e).into()),
        };
        let record = serde_json::from_str(&content).map_err(|e| StoreError::corrupt(&path, e))?;
        Ok(Some(record))
    }

    async fn save(&self, trainee: &str, record: &ProgressRecord) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.record_path(trainee);
        let json = serde_json::to_string_pretty(record)?;

        // Write beside the record, then rename over it.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        tracing::debug!(path = %path.display(), "progress saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arvtrain_core::curriculum::CurriculumId;

    fn record() -> ProgressRecord {
        let mut record = ProgressRecord::new();
        let entry = record
            .curricula
            .entry(CurriculumId::new("valuation"))
            .or_default();
        entry.completed.insert(0);
        entry.completed.insert(1);
        record
    }

    #[test]
    fn file_names_are_encoded() {
        assert_eq!(file_stem("Ann@Example.com"), "ann%40example.com");
        assert_eq!(file_stem("ann_example.com"), "ann_example.com");
        assert_eq!(file_stem("../../etc/passwd"), "%2E.%2F..%2Fetc%2Fpasswd");
        assert_eq!(file_stem("50%"), "50%25");
        assert_eq!(file_stem(""), "%");
    }

    #[test]
    fn distinct_keys_get_distinct_files() {
        let keys = [
            "ann@example.com",
            "ann_example.com",
            "ann%40example.com",
            "ann+example.com",
            "ann example.com",
            ".ann",
            "%2eann",
            "",
            "%",
        ];
        let stems: std::collections::HashSet<_> = keys.iter().map(|k| file_stem(k)).collect();
        assert_eq!(stems.len(), keys.len());
    }

    #[tokio::test]
    async fn lookalike_trainee_does_not_see_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.save("ann@example.com", &record()).await.unwrap();

        assert!(store.load("ann_example.com").await.unwrap().is_none());
        assert!(store.load("ann+example.com").await.unwrap().is_none());
        assert!(store.load("ANN@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("progress"));
        store.save("ann@example.com", &record()).await.unwrap();

        let loaded = store.load("ann@example.com").await.unwrap().unwrap();
        assert_eq!(loaded, record());
        assert_eq!(loaded.frontier(&"valuation".into()), 2);
        assert!(!store.record_path("ann@example.com").with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        std::fs::write(store.record_path("ann@example.com"), "{{{").unwrap();
        let err = store.load("ann@example.com").await.unwrap_err();
        assert!(err.to_string().contains("corrupt"));
    }
}
