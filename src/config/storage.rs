//! Persisted storage for the current config document
//!
//! The store reads and writes whole documents; how they reach disk is up to
//! the [`DocumentStorage`] implementation.

use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::PersistenceError;

type Result<T> = std::result::Result<T, PersistenceError>;

/// A single named document per plugin instance
pub trait DocumentStorage {
    /// `Ok(None)` when nothing has been persisted yet
    fn read(&self) -> Result<Option<Value>>;

    /// Replace the persisted document. Either the previous document or the
    /// complete new one must survive a failure.
    fn write(&self, document: &Value) -> Result<()>;

    /// Human readable location, for logs
    fn describe(&self) -> String;
}

/// Pretty-printed JSON file, replaced through a temp file and rename
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `bytes` to `temp_path`, flush it to disk and move it over the target
    fn replace_with(&self, temp_path: &Path, bytes: &[u8]) -> Result<()> {
        let mut file = File::create(temp_path).map_err(|e| PersistenceError::Io {
            operation: "create",
            path: temp_path.to_path_buf(),
            source: e,
        })?;
        file.write_all(bytes).map_err(|e| PersistenceError::Io {
            operation: "write",
            path: temp_path.to_path_buf(),
            source: e,
        })?;
        file.sync_all().map_err(|e| PersistenceError::Io {
            operation: "sync",
            path: temp_path.to_path_buf(),
            source: e,
        })?;
        drop(file);

        fs::rename(temp_path, &self.path).map_err(|e| PersistenceError::AtomicWriteFailed {
            temp_path: temp_path.to_path_buf(),
            target_path: self.path.clone(),
            source: e,
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(crate::constants::config::TEMP_SUFFIX);
        self.path.with_file_name(name)
    }
}

impl DocumentStorage for JsonFileStorage {
    fn read(&self) -> Result<Option<Value>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted config yet");
                return Ok(None);
            }
            Err(e) => {
                return Err(PersistenceError::Io {
                    operation: "read",
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        parse_document(&contents, &self.path).map(Some)
    }

    fn write(&self, document: &Value) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|source| PersistenceError::Json { source })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
                operation: "create directory",
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let temp_path = self.temp_path();
        if let Err(e) = self.replace_with(&temp_path, &bytes) {
            if let Err(cleanup) = fs::remove_file(&temp_path)
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temp config file");
            }
            return Err(e);
        }

        info!(path = %self.path.display(), "Saved config");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory storage. Clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    document: Rc<RefCell<Option<Value>>>,
    read_only: Rc<Cell<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Value) -> Self {
        let storage = Self::new();
        *storage.document.borrow_mut() = Some(document);
        storage
    }

    /// Snapshot of what is currently persisted
    pub fn document(&self) -> Option<Value> {
        self.document.borrow().clone()
    }

    /// Reject writes, as a locked or read-only file would
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }
}

impl DocumentStorage for MemoryStorage {
    fn read(&self) -> Result<Option<Value>> {
        Ok(self.document.borrow().clone())
    }

    fn write(&self, document: &Value) -> Result<()> {
        if self.read_only.get() {
            return Err(PersistenceError::Unavailable {
                reason: "storage is read-only".to_string(),
            });
        }
        *self.document.borrow_mut() = Some(document.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Read the plugin-shipped defaults document
pub fn load_defaults(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path).map_err(|e| PersistenceError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source: e,
    })?;
    let defaults = parse_document(&contents, path)?;
    info!(path = %path.display(), keys = defaults.as_object().map_or(0, |m| m.len()), "Loaded default config");
    Ok(defaults)
}

/// Parse a JSON document whose root must be a mapping
pub(crate) fn parse_document(contents: &str, path: &Path) -> Result<Value> {
    let document: Value =
        serde_json::from_str(contents).map_err(|e| PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    ensure_mapping(document, path)
}

pub(crate) fn ensure_mapping(document: Value, path: &Path) -> Result<Value> {
    if document.is_object() {
        Ok(document)
    } else {
        Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "top-level value must be an object".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("config.json"));
        assert!(storage.read().unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let storage = JsonFileStorage::new(&path);

        let document = json!({"fruit": "pear", "apple": {"color": "#00ff00"}});
        storage.write(&document).unwrap();

        assert!(path.exists());
        assert!(!storage.temp_path().exists());
        assert_eq!(storage.read().unwrap(), Some(document));
    }

    #[test]
    fn test_write_replaces_previous_document() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("config.json"));
        storage.write(&json!({"a": 1, "b": 2})).unwrap();
        storage.write(&json!({"a": 3})).unwrap();
        assert_eq!(storage.read().unwrap(), Some(json!({"a": 3})));
    }

    #[test]
    fn test_key_order_survives_round_trip() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("config.json"));
        storage.write(&json!({"zeta": 1, "alpha": 2, "mid": 3})).unwrap();

        let read = storage.read().unwrap().unwrap();
        let keys: Vec<&String> = read.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let storage = JsonFileStorage::new(&path);
        assert!(matches!(
            storage.read(),
            Err(PersistenceError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_failed_replace_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();
        let storage = JsonFileStorage::new(&path);

        assert!(matches!(
            storage.write(&json!({"a": 1})),
            Err(PersistenceError::AtomicWriteFailed { .. })
        ));
        assert!(!storage.temp_path().exists());
        assert!(path.is_dir());
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            load_defaults(&path),
            Err(PersistenceError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_memory_storage_shares_document_and_honors_read_only() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.write(&json!({"a": 1})).unwrap();
        assert_eq!(other.read().unwrap(), Some(json!({"a": 1})));

        other.set_read_only(true);
        assert!(matches!(
            storage.write(&json!({"a": 2})),
            Err(PersistenceError::Unavailable { .. })
        ));
        assert_eq!(storage.document(), Some(json!({"a": 1})));
    }
}
