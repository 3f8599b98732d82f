//! On-disk persistence for tasknest
//!
//! Every key of the persistence port is one JSON document in the data
//! directory. Writes are atomic and serialized through a per-file lock.
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/
//!   tasknest.toml             # Optional configuration
//!   user.json                 # Signed-in user
//!   profile.json              # Profile of the signed-in user
//!   account.json              # Registered account, kept across sign-out
//!   previousPasswords.json    # Credential history
//!   tasks.json                # Task collection
//!   *.json.lock               # Advisory lock files
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::CONFIG_FILE;
use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};
use crate::port::KeyValueStore;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "TASKNEST_DIR";

/// Fallback directory name when no platform data dir is available
const LOCAL_FALLBACK_DIR: &str = ".tasknest";

/// File-backed key-value store rooted at a data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    /// Open the store at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        })
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    /// Path to the data directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the configuration file inside the data directory
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Path of the document holding `key`
    pub fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.key_path(key)?;
        let Some(data) = lock::read_locked(&path, self.lock_timeout_ms)? else {
            return Ok(None);
        };
        let value = serde_json::from_slice(&data)
            .map_err(|e| Error::Persistence(format!("failed to parse {}: {e}", path.display())))?;
        tracing::debug!(key, path = %path.display(), "read key");
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let path = self.key_path(key)?;
        let json = serde_json::to_string_pretty(&value)?;
        lock::write_atomic_locked(&path, json.as_bytes(), self.lock_timeout_ms)?;
        tracing::debug!(key, path = %path.display(), "wrote key");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        lock::remove_locked(&path, self.lock_timeout_ms)?;
        tracing::debug!(key, path = %path.display(), "removed key");
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidArgument("storage key is required".to_string()));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(Error::InvalidArgument(format!(
            "invalid storage key '{key}': must not contain path separators"
        )));
    }
    if key.contains("..") {
        return Err(Error::InvalidArgument(format!(
            "invalid storage key '{key}': must not contain '..'"
        )));
    }
    Ok(())
}

/// Resolve the data directory.
///
/// Order: explicit path, `TASKNEST_DIR`, the platform data directory,
/// then `./.tasknest`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(raw) = std::env::var(DATA_DIR_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    directories::ProjectDirs::from("", "", "tasknest")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(LOCAL_FALLBACK_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_store_paths() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();

        assert_eq!(store.root(), temp.path());
        assert_eq!(store.config_file(), temp.path().join("tasknest.toml"));
        assert_eq!(
            store.key_path("previousPasswords").unwrap(),
            temp.path().join("previousPasswords.json")
        );
    }

    #[test]
    fn open_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");

        let store = FileStore::open(&nested).unwrap();
        assert!(store.root().is_dir());
    }

    #[test]
    fn set_get_delete_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();

        assert!(store.get("user").unwrap().is_none());

        store
            .set("user", json!({"id": 1, "email": "a@x.com", "password": "p1"}))
            .unwrap();
        let value = store.get("user").unwrap().unwrap();
        assert_eq!(value["email"], "a@x.com");

        store.delete("user").unwrap();
        assert!(store.get("user").unwrap().is_none());
        assert!(!temp.path().join("user.json").exists());
    }

    #[test]
    fn values_survive_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let store = FileStore::open(temp.path()).unwrap();
            store.set("previousPasswords", json!(["p1", "p2"])).unwrap();
        }

        let store = FileStore::open(temp.path()).unwrap();
        assert_eq!(
            store.get("previousPasswords").unwrap(),
            Some(json!(["p1", "p2"]))
        );
    }

    #[test]
    fn rejects_path_like_keys() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();

        for key in ["", "  ", "../user", "a/b", "a\\b"] {
            let err = store.set(key, json!(1)).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "key {key:?}");
        }
    }

    #[test]
    fn corrupt_document_is_a_persistence_error() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        fs::write(temp.path().join("profile.json"), "{not json").unwrap();

        let err = store.get("profile").unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[test]
    fn explicit_data_dir_wins() {
        let temp = TempDir::new().unwrap();
        assert_eq!(resolve_data_dir(Some(temp.path())), temp.path().to_path_buf());
    }
}
