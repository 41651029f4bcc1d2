//! Path-addressable config store with default fallback
//!
//! Reads resolve against the current document first and fall back to the
//! shipped defaults; writes only ever touch the current document.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::{debug, error, info};

use super::error::{ConfigError, PersistenceError, Result};
use super::listeners::{self, ChangeEvent, ListenerId, ListenerRegistry, ListenerScope};
use super::path::{self, ConfigPath};
use super::storage::{self, DocumentStorage, MemoryStorage};

/// Anything that names a config key
pub trait ToConfigPath {
    fn to_config_path(&self) -> Result<ConfigPath>;
}

impl ToConfigPath for str {
    fn to_config_path(&self) -> Result<ConfigPath> {
        ConfigPath::parse(self)
    }
}

impl ToConfigPath for String {
    fn to_config_path(&self) -> Result<ConfigPath> {
        ConfigPath::parse(self)
    }
}

impl ToConfigPath for ConfigPath {
    fn to_config_path(&self) -> Result<ConfigPath> {
        Ok(self.clone())
    }
}

pub struct ConfigStore {
    current: RefCell<Value>,
    /// Never mutated, so clones may share it
    defaults: Rc<Value>,
    storage: Rc<dyn DocumentStorage>,
    dirty: Cell<bool>,
    listeners: ListenerRegistry,
}

impl ConfigStore {
    /// Build a store over `storage`, reading the persisted document now.
    /// Keys missing from storage resolve through `defaults` at lookup time.
    pub fn new(defaults: Value, storage: Rc<dyn DocumentStorage>) -> Result<Self> {
        let defaults = storage::ensure_mapping(defaults, Path::new("<defaults>"))?;
        let current = read_current(storage.as_ref())?;
        info!(
            storage = %storage.describe(),
            keys = current.as_object().map_or(0, Map::len),
            "Loaded config"
        );
        Ok(Self {
            current: RefCell::new(current),
            defaults: Rc::new(defaults),
            storage,
            dirty: Cell::new(false),
            listeners: ListenerRegistry::default(),
        })
    }

    /// Store backed by a fresh [`MemoryStorage`]
    pub fn in_memory(defaults: Value) -> Result<Self> {
        Self::new(defaults, Rc::new(MemoryStorage::new()))
    }

    /// Value at `key`, falling back to the defaults document
    pub fn get<K: ToConfigPath + ?Sized>(&self, key: &K) -> Result<Value> {
        let path = key.to_config_path()?;
        self.lookup(&path)?
            .ok_or_else(|| ConfigError::KeyNotFound {
                key: path.to_string(),
            })
    }

    /// Like [`get`](Self::get) but returns `default` when neither document has the key
    pub fn get_or<K: ToConfigPath + ?Sized>(&self, key: &K, default: Value) -> Result<Value> {
        let path = key.to_config_path()?;
        Ok(self.lookup(&path)?.unwrap_or(default))
    }

    /// Value at `key` in the defaults document only
    pub fn get_default<K: ToConfigPath + ?Sized>(&self, key: &K) -> Result<Value> {
        let path = key.to_config_path()?;
        path::resolve_get(&self.defaults, &path, None)?
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound {
                key: path.to_string(),
            })
    }

    pub fn defaults(&self) -> &Value {
        &self.defaults
    }

    /// Whether `key` is present in the current document (defaults ignored)
    pub fn contains<K: ToConfigPath + ?Sized>(&self, key: &K) -> bool {
        let Ok(path) = key.to_config_path() else {
            return false;
        };
        matches!(
            path::resolve_get(&self.current.borrow(), &path, None),
            Ok(Some(_))
        )
    }

    /// Top-level keys of the current document, in document order
    pub fn keys(&self) -> Vec<String> {
        self.current
            .borrow()
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Write `value` at `key` in the current document and notify listeners.
    ///
    /// The write stands even if listeners fail; their errors are returned
    /// after every listener has run.
    pub fn set<K: ToConfigPath + ?Sized>(&self, key: &K, value: Value) -> Result<()> {
        let path = key.to_config_path()?;
        let old = self.lookup(&path)?;
        path::resolve_set(&mut self.current.borrow_mut(), &path, value.clone())?;
        self.dirty.set(true);
        debug!(key = %path, value = %value, "Config value set");

        self.notify(ChangeEvent::Key {
            path,
            old,
            new: Some(value),
        })
    }

    /// Remove `key` from the current document and return its value.
    /// Reads that follow fall back to the defaults document.
    pub fn pop<K: ToConfigPath + ?Sized>(&self, key: &K) -> Result<Value> {
        let path = key.to_config_path()?;
        let removed = path::resolve_delete(&mut self.current.borrow_mut(), &path)?;
        self.dirty.set(true);
        debug!(key = %path, "Config value removed");

        self.notify(ChangeEvent::Key {
            path,
            old: Some(removed.clone()),
            new: None,
        })?;
        Ok(removed)
    }

    pub fn delete<K: ToConfigPath + ?Sized>(&self, key: &K) -> Result<()> {
        self.pop(key).map(|_| ())
    }

    /// Independent deep copy of the current document
    pub fn to_document(&self) -> Value {
        self.current.borrow().clone()
    }

    pub fn to_json(&self) -> String {
        self.current.borrow().to_string()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&*self.current.borrow())
            .map_err(|source| PersistenceError::Json { source }.into())
    }

    /// Discard the current document and re-read it from storage.
    /// On failure the current document is left as it was.
    pub fn load(&self) -> Result<()> {
        let current = read_current(self.storage.as_ref()).inspect_err(|e| {
            error!(storage = %self.storage.describe(), error = %e, "Failed to reload config");
        })?;
        *self.current.borrow_mut() = current;
        self.dirty.set(false);
        info!(storage = %self.storage.describe(), "Reloaded config");
        self.notify(ChangeEvent::Reloaded)
    }

    /// Persist the current document
    pub fn save(&self) -> Result<()> {
        self.storage
            .write(&self.current.borrow())
            .inspect_err(|e| {
                error!(storage = %self.storage.describe(), error = %e, "Failed to save config");
            })?;
        self.dirty.set(false);
        Ok(())
    }

    /// Replace the current document with a copy of the defaults.
    /// Nothing is persisted until [`save`](Self::save).
    pub fn restore_defaults(&self) -> Result<()> {
        *self.current.borrow_mut() = Value::clone(&self.defaults);
        self.dirty.set(true);
        info!("Restored default config");
        self.notify(ChangeEvent::Reloaded)
    }

    /// Replace the current document wholesale, as the raw JSON editor does
    pub fn replace_document(&self, document: Value) -> Result<()> {
        let document = storage::ensure_mapping(document, Path::new("<edited>"))?;
        *self.current.borrow_mut() = document;
        self.dirty.set(true);
        self.notify(ChangeEvent::Reloaded)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty.get()
    }

    /// Register `callback` for changes at or below `prefix`.
    /// The empty prefix receives every change.
    pub fn on_change<F>(&self, prefix: &str, callback: F) -> Result<ListenerId>
    where
        F: Fn(&ChangeEvent) -> Result<()> + 'static,
    {
        let scope = ListenerScope::prefix(prefix)?;
        Ok(self.subscribe(scope, callback))
    }

    pub fn subscribe<F>(&self, scope: ListenerScope, callback: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) -> Result<()> + 'static,
    {
        self.listeners.register(scope, Rc::new(callback))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn lookup(&self, path: &ConfigPath) -> Result<Option<Value>> {
        if let Some(value) = path::resolve_get(&self.current.borrow(), path, None)? {
            return Ok(Some(value.clone()));
        }
        // Defaults only fill gaps in `current`; a shape they disagree on is a gap too
        match path::resolve_get(&self.defaults, path, None) {
            Ok(value) => Ok(value.cloned()),
            Err(ConfigError::PathConflict { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn notify(&self, event: ChangeEvent) -> Result<()> {
        let key = event
            .path()
            .map_or_else(|| "*".to_string(), ConfigPath::to_string);
        let failures = self.listeners.dispatch(&event);
        listeners::into_result(key, failures)
    }
}

/// Deep copy for scratch editing: same defaults and storage, no listeners
impl Clone for ConfigStore {
    fn clone(&self) -> Self {
        Self {
            current: RefCell::new(self.current.borrow().clone()),
            defaults: Rc::clone(&self.defaults),
            storage: Rc::clone(&self.storage),
            dirty: Cell::new(self.dirty.get()),
            listeners: ListenerRegistry::default(),
        }
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("current", &self.current.borrow())
            .field("storage", &self.storage.describe())
            .field("dirty", &self.dirty.get())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn read_current(storage: &dyn DocumentStorage) -> Result<Value> {
    match storage.read()? {
        Some(document) => Ok(storage::ensure_mapping(
            document,
            Path::new(&storage.describe()),
        )?),
        None => Ok(Value::Object(Map::new())),
    }
}
