// ── Key/value persistence ──
//
// A namespace of JSON values addressed by key. The in-memory backend is
// used by tests and dry runs; the file backend keeps one JSON document
// per key inside a directory named after the namespace.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::trace;

use crate::error::StoreError;

/// Persistence capability scoped to one namespace.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All keys, sorted.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Keys become file names, so they are limited to a portable alphabet.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey { key: key.to_owned() })
    }
}

// ── MemoryStorage ────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStorage {
    values: DashMap<String, Value>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a storage with raw values, e.g. a layout written by an older version.
    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        validate_key(key)?;
        self.values.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.values.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}

// ── FileStorage ──────────────────────────────────────────────────

const EXTENSION: &str = "json";

pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage for `namespace` under `root`. Nothing is created until the
    /// first write.
    pub fn new(root: impl AsRef<Path>, namespace: &str) -> Self {
        Self {
            dir: root.as_ref().join(namespace),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }
}

fn io_error(key: &str, source: std::io::Error) -> StoreError {
    StoreError::Io {
        key: key.to_owned(),
        source,
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StoreError::Json {
                    key: key.to_owned(),
                    source,
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.path(key)?;
        let bytes = serde_json::to_vec_pretty(&value).map_err(|source| StoreError::Json {
            key: key.to_owned(),
            source,
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(key, e))?;

        // Write-then-rename so readers never observe a partial document.
        let tmp = self.dir.join(format!(".{key}.{EXTENSION}.tmp"));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_error(key, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(key, e))?;
        trace!(path = %path.display(), "value persisted");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("*", e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error("*", e))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.starts_with('.') {
                    keys.push(stem.to_owned());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn file_storage_round_trips_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path(), "bridges");
        storage.set("ids", json!(["a", "b"])).await.unwrap();
        storage.set("a", json!({"name": "A"})).await.unwrap();

        let reopened = FileStorage::new(dir.path(), "bridges");
        assert_eq!(reopened.get("ids").await.unwrap(), Some(json!(["a", "b"])));
        assert_eq!(reopened.keys().await.unwrap(), vec!["a", "ids"]);
    }

    #[tokio::test]
    async fn file_storage_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path(), "bridges");
        assert_eq!(storage.get("version").await.unwrap(), None);
        assert!(storage.keys().await.unwrap().is_empty());
        storage.delete("version").await.unwrap();
    }

    #[tokio::test]
    async fn file_storage_delete_removes_value() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path(), "bridges");
        storage.set("version", json!(4)).await.unwrap();
        storage.delete("version").await.unwrap();
        assert_eq!(storage.get("version").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path(), "bridges");
        std::fs::create_dir_all(storage.dir()).unwrap();
        std::fs::write(storage.dir().join("ids.json"), b"{not json").unwrap();
        assert!(matches!(
            storage.get("ids").await,
            Err(StoreError::Json { .. })
        ));
    }

    #[tokio::test]
    async fn keys_must_be_file_safe() {
        let storage = MemoryStorage::new();
        for key in ["", "../etc", ".hidden", "a/b"] {
            assert!(matches!(
                storage.set(key, json!(1)).await,
                Err(StoreError::InvalidKey { .. })
            ));
        }
    }
}
