//! Change notification for [`ConfigStore`](super::ConfigStore)
//!
//! Listeners are kept as an ordered list of (scope, callback) pairs and are
//! invoked in registration order. Each invocation is isolated: a failing
//! listener is recorded and the remaining ones still run.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, warn};

use super::error::{ConfigError, ListenerFailure, Result};
use super::path::ConfigPath;

/// What changed in the store
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A single key was set or removed. `new` is `None` after a removal,
    /// `old` is `None` when the key resolved in neither document.
    Key {
        path: ConfigPath,
        old: Option<Value>,
        new: Option<Value>,
    },
    /// `current` was replaced wholesale (load, restore defaults, raw edit)
    Reloaded,
}

impl ChangeEvent {
    pub fn path(&self) -> Option<&ConfigPath> {
        match self {
            ChangeEvent::Key { path, .. } => Some(path),
            ChangeEvent::Reloaded => None,
        }
    }
}

/// Which changes a listener receives. Every scope receives `Reloaded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerScope {
    /// Every change
    All,
    /// Changes at or below the prefix
    Prefix(ConfigPath),
    /// Changes at, below, or above the path (a write to `apple` reaches a
    /// listener on `apple.color`)
    Overlapping(ConfigPath),
}

impl ListenerScope {
    /// Parse a dotted prefix; the empty string is the wildcard scope
    pub fn prefix(prefix: &str) -> Result<Self> {
        if prefix.is_empty() {
            Ok(ListenerScope::All)
        } else {
            ConfigPath::parse(prefix).map(ListenerScope::Prefix)
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        let Some(changed) = event.path() else {
            return true;
        };
        match self {
            ListenerScope::All => true,
            ListenerScope::Prefix(prefix) => prefix.is_prefix_of(changed),
            ListenerScope::Overlapping(path) => path.overlaps(changed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type ListenerFn = dyn Fn(&ChangeEvent) -> Result<()>;

struct Listener {
    id: ListenerId,
    scope: ListenerScope,
    callback: Rc<ListenerFn>,
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<Listener>>,
}

impl ListenerRegistry {
    pub fn register(&self, scope: ListenerScope, callback: Rc<ListenerFn>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        debug!(listener = %id, scope = ?scope, "Registered config listener");
        self.listeners.borrow_mut().push(Listener {
            id,
            scope,
            callback,
        });
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        before != listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Run every matching listener and collect failures.
    ///
    /// The list is snapshotted first so callbacks may register, remove or
    /// trigger further changes re-entrantly.
    pub fn dispatch(&self, event: &ChangeEvent) -> Vec<ListenerFailure> {
        let targets: Vec<(ListenerId, Rc<ListenerFn>)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|listener| listener.scope.matches(event))
            .map(|listener| (listener.id, Rc::clone(&listener.callback)))
            .collect();

        let mut failures = Vec::new();
        for (id, callback) in targets {
            // Removed by an earlier callback in this dispatch
            if !self.contains(id) {
                continue;
            }
            if let Err(error) = callback(event) {
                warn!(listener = %id, error = %error, "Config listener failed");
                failures.push(ListenerFailure { listener: id, error });
            }
        }
        failures
    }

    fn contains(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|listener| listener.id == id)
    }
}

/// Turn collected failures into the error surfaced by the mutating call
pub(crate) fn into_result(key: String, failures: Vec<ListenerFailure>) -> Result<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Listeners { key, failures })
    }
}
