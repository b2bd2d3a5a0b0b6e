//! Durable local key-value storage
//!
//! Values are whole strings written in one operation. [`FileStore`] keeps one
//! file per key and replaces it by rename, so a reader sees either the old
//! value or the new one, never a partial write.

mod repository;

pub use repository::ProfileRepository;

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::constants::store::VALUE_EXTENSION;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value under `key` in a single operation
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Store backed by a directory, one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{VALUE_EXTENSION}"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                debug!(path = %path.display(), bytes = contents.len(), "Read store value");
                Ok(Some(contents))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let write_err = |source: std::io::Error| StoreError::Write {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_err)?;

        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!(".{key}.{VALUE_EXTENSION}.tmp"));
        {
            let mut tmp = fs::File::create(&tmp_path).map_err(write_err)?;
            tmp.write_all(value.as_bytes()).map_err(write_err)?;
            tmp.sync_all().map_err(write_err)?;
        }
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_err(e));
        }

        info!(path = %path.display(), bytes = value.len(), "Wrote store value");
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    /// When set, every write fails with this message
    pub fail_writes: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(message) = &self.fail_writes {
            return Err(StoreError::Write {
                key: key.to_string(),
                source: std::io::Error::other(message.clone()),
            });
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.get("absent").unwrap().is_none());
    }

    #[test]
    fn test_file_store_set_replaces_value() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path().join("nested"));

        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));

        // No temp file left behind
        let names: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["k.json".to_string()]);
    }

    #[test]
    fn test_file_store_ignores_stray_temp_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".k.json.tmp"), "half-writ").unwrap();
        let mut store = FileStore::new(dir.path());
        assert!(store.get("k").unwrap().is_none());

        store.set("k", "whole").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("whole"));
        assert!(!dir.path().join(".k.json.tmp").exists());
    }

    #[test]
    fn test_file_store_write_error_when_dir_is_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let mut store = FileStore::new(&blocker);
        assert!(matches!(store.set("k", "v"), Err(StoreError::Write { .. })));
    }

    #[test]
    fn test_memory_store_failing_writes() {
        let mut store = MemoryStore::new();
        store.set("k", "v").unwrap();
        store.fail_writes = Some("disk full".to_string());

        assert!(matches!(store.set("k", "w"), Err(StoreError::Write { .. })));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
