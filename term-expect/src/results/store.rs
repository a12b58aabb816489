//! Persistence of validation results.
//!
//! Results are append-only: adding under a key that is already stored fails
//! with [`TermError::AlreadyExists`] instead of overwriting history.

use super::{ValidationResult, ValidationResultIdentifier};
use crate::prelude::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Storage backend for validation results.
///
/// # Example
///
/// ```rust,ignore
/// use term_expect::results::{InMemoryResultStore, ValidationResultStore};
///
/// let store = InMemoryResultStore::new();
/// store.add(&key, &result).await?;
/// assert_eq!(store.len().await?, 1);
/// ```
#[async_trait]
pub trait ValidationResultStore: Debug + Send + Sync {
    /// Stores `result` under `key`. Existing keys are never overwritten.
    async fn add(&self, key: &ValidationResultIdentifier, result: &ValidationResult)
        -> Result<()>;

    /// Loads the result stored under `key`.
    async fn get(&self, key: &ValidationResultIdentifier) -> Result<Option<ValidationResult>>;

    /// Every stored key, oldest run first.
    async fn list_keys(&self) -> Result<Vec<ValidationResultIdentifier>>;

    async fn exists(&self, key: &ValidationResultIdentifier) -> Result<bool> {
        Ok(self.list_keys().await?.iter().any(|k| k == key))
    }

    /// Number of stored results.
    async fn len(&self) -> Result<usize> {
        Ok(self.list_keys().await?.len())
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

fn sort_keys(keys: &mut [ValidationResultIdentifier]) {
    keys.sort_by(|a, b| {
        a.run_id()
            .run_time()
            .cmp(&b.run_id().run_time())
            .then_with(|| a.suite_name().cmp(b.suite_name()))
            .then_with(|| a.batch_identifier().cmp(b.batch_identifier()))
    });
}

/// Result store writing one JSON file per result under a root directory.
#[derive(Debug, Clone)]
pub struct FilesystemResultStore {
    root: PathBuf,
}

impl FilesystemResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute location of the file for `key`.
    pub fn path_for(&self, key: &ValidationResultIdentifier) -> PathBuf {
        self.root.join(key.relative_path("json"))
    }

    /// Lists the entries of `dir`, treating a missing directory as empty.
    async fn read_dir(dir: &Path) -> Result<Vec<(PathBuf, bool)>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let is_dir = entry.file_type().await?.is_dir();
            out.push((entry.path(), is_dir));
        }
        Ok(out)
    }
}

#[async_trait]
impl ValidationResultStore for FilesystemResultStore {
    #[instrument(skip(self, result), fields(key = %key, store_type = "filesystem"))]
    async fn add(
        &self,
        key: &ValidationResultIdentifier,
        result: &ValidationResult,
    ) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(result)?;
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(TermError::already_exists("validation result", key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(json.as_bytes()).await?;
        file.flush().await?;

        info!(success = result.success, "Stored validation result");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key, store_type = "filesystem"))]
    async fn get(&self, key: &ValidationResultIdentifier) -> Result<Option<ValidationResult>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(store_type = "filesystem"))]
    async fn list_keys(&self) -> Result<Vec<ValidationResultIdentifier>> {
        let mut keys = Vec::new();

        // <suite>/<run_name>/<run_time>/<batch>.json
        for (suite_dir, is_dir) in Self::read_dir(&self.root).await? {
            if !is_dir {
                continue;
            }
            for (run_dir, is_dir) in Self::read_dir(&suite_dir).await? {
                if !is_dir {
                    continue;
                }
                for (time_dir, is_dir) in Self::read_dir(&run_dir).await? {
                    if !is_dir {
                        continue;
                    }
                    for (file, is_dir) in Self::read_dir(&time_dir).await? {
                        if is_dir || file.extension().and_then(|e| e.to_str()) != Some("json") {
                            continue;
                        }
                        let Ok(relative) = file.strip_prefix(&self.root) else {
                            continue;
                        };
                        match ValidationResultIdentifier::from_relative_path(relative) {
                            Ok(key) => keys.push(key),
                            Err(e) => {
                                warn!(path = %file.display(), error = %e, "Skipping unrecognized file in result store");
                            }
                        }
                    }
                }
            }
        }

        sort_keys(&mut keys);
        Ok(keys)
    }

    async fn exists(&self, key: &ValidationResultIdentifier) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }
}

/// Result store kept in memory, for tests and throwaway contexts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResultStore {
    storage: Arc<RwLock<HashMap<ValidationResultIdentifier, ValidationResult>>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ValidationResultStore for InMemoryResultStore {
    #[instrument(skip(self, result), fields(key = %key, store_type = "in_memory"))]
    async fn add(
        &self,
        key: &ValidationResultIdentifier,
        result: &ValidationResult,
    ) -> Result<()> {
        let mut store = self.storage.write().await;
        if store.contains_key(key) {
            return Err(TermError::already_exists("validation result", key.to_string()));
        }
        store.insert(key.clone(), result.clone());
        Ok(())
    }

    async fn get(&self, key: &ValidationResultIdentifier) -> Result<Option<ValidationResult>> {
        Ok(self.storage.read().await.get(key).cloned())
    }

    async fn list_keys(&self) -> Result<Vec<ValidationResultIdentifier>> {
        let mut keys: Vec<_> = self.storage.read().await.keys().cloned().collect();
        sort_keys(&mut keys);
        Ok(keys)
    }

    async fn exists(&self, key: &ValidationResultIdentifier) -> Result<bool> {
        Ok(self.storage.read().await.contains_key(key))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.storage.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::test_support::sample_result;
    use crate::results::RunIdentifier;
    use chrono::{TimeZone, Utc};

    fn key_at(seconds: u32, batch: &str) -> ValidationResultIdentifier {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, seconds).unwrap();
        let run_id = RunIdentifier::new(Some("my_run".to_string()), time).unwrap();
        ValidationResultIdentifier::new("my_hello_world_suite", run_id, batch).unwrap()
    }

    async fn exercise_store(store: &dyn ValidationResultStore) {
        assert!(store.is_empty().await.unwrap());

        let later = key_at(30, "my_batch");
        let earlier = key_at(10, "my_batch");
        let result = sample_result("my_hello_world_suite", true);

        store.add(&later, &result).await.unwrap();
        store.add(&earlier, &result).await.unwrap();

        let err = store.add(&later, &result).await.unwrap_err();
        assert!(err.is_already_exists());

        assert_eq!(store.len().await.unwrap(), 2);
        assert_eq!(store.list_keys().await.unwrap(), vec![earlier.clone(), later]);
        assert!(store.exists(&earlier).await.unwrap());
        assert!(!store.exists(&key_at(50, "my_batch")).await.unwrap());
        assert_eq!(store.get(&earlier).await.unwrap(), Some(result));
        assert_eq!(store.get(&key_at(50, "x")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryResultStore::new();
        exercise_store(&store).await;

        let shared = store.clone();
        assert_eq!(shared.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_filesystem_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemResultStore::new(dir.path().join("validations"));
        exercise_store(&store).await;

        assert!(dir
            .path()
            .join("validations/my_hello_world_suite/my_run/20240301T120010.000000Z/my_batch.json")
            .exists());
    }

    #[tokio::test]
    async fn test_filesystem_store_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemResultStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("s/run/not-a-time")).unwrap();
        std::fs::write(dir.path().join("s/run/not-a-time/b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("README.txt"), "notes").unwrap();

        assert!(store.list_keys().await.unwrap().is_empty());
    }
}
