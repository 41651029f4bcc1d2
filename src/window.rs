//! Settings window lifecycle
//!
//! `Closed -> Building -> Open -> {Committing, Discarding} -> Closed`
//!
//! While the window is open, edits flow through the bindings straight into
//! the store. The controller only decides when the store is persisted or
//! rolled back, and when the bindings go away.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::binding::Binding;
use crate::config::{ConfigError, ConfigStore, PersistenceError, Result};
use crate::layout::LayoutRegistry;
use crate::toolkit::Toolkit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Closed,
    Building,
    Open,
    Committing,
    Discarding,
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowState::Closed => "closed",
            WindowState::Building => "building",
            WindowState::Open => "open",
            WindowState::Committing => "committing",
            WindowState::Discarding => "discarding",
        };
        f.write_str(name)
    }
}

/// Stands in for a file path in errors about raw JSON input
const RAW_EDITOR_SOURCE: &str = "<advanced editor>";

/// Runs during commit, before the store is saved
pub type SaveHook = Box<dyn Fn(&ConfigStore) -> Result<()>>;

struct OpenWindow<T: Toolkit> {
    store: Rc<ConfigStore>,
    root: Rc<T::Container>,
    bindings: Vec<Binding>,
}

pub struct WindowController<T: Toolkit> {
    toolkit: Rc<T>,
    title: String,
    state: WindowState,
    open: Option<OpenWindow<T>>,
    save_hooks: Vec<SaveHook>,
}

impl<T: Toolkit> WindowController<T> {
    pub fn new(toolkit: Rc<T>, title: impl Into<String>) -> Self {
        Self {
            toolkit,
            title: title.into(),
            state: WindowState::Closed,
            open: None,
            save_hooks: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == WindowState::Open
    }

    pub fn toolkit(&self) -> &Rc<T> {
        &self.toolkit
    }

    /// Root container of the open window
    pub fn root(&self) -> Option<&Rc<T::Container>> {
        self.open.as_ref().map(|open| &open.root)
    }

    /// Store the open window edits
    pub fn store(&self) -> Option<&Rc<ConfigStore>> {
        self.open.as_ref().map(|open| &open.store)
    }

    pub fn binding_count(&self) -> usize {
        self.open.as_ref().map_or(0, |open| open.bindings.len())
    }

    /// Register a hook that runs on every commit before the store is saved.
    /// A failing hook aborts the commit.
    pub fn execute_on_save<F>(&mut self, hook: F)
    where
        F: Fn(&ConfigStore) -> Result<()> + 'static,
    {
        self.save_hooks.push(Box::new(hook));
    }

    /// Materialize `layout` against `store` and bind every control.
    ///
    /// Any failure tears the half-built window down again and leaves the
    /// controller `Closed`.
    pub fn open(&mut self, store: &Rc<ConfigStore>, layout: &LayoutRegistry) -> Result<()> {
        self.expect_state("open", WindowState::Closed)?;
        self.state = WindowState::Building;
        info!(title = %self.title, tabs = ?layout.tab_names(), "Opening settings window");

        let root = self.toolkit.create_window(&self.title);
        match layout.materialize(self.toolkit.as_ref(), &root, store) {
            Ok(bindings) => {
                debug!(bindings = bindings.len(), "Settings window open");
                self.open = Some(OpenWindow {
                    store: Rc::clone(store),
                    root,
                    bindings,
                });
                self.state = WindowState::Open;
                Ok(())
            }
            Err(e) => {
                error!(title = %self.title, error = %e, "Failed to build settings window");
                self.toolkit.close_window();
                self.state = WindowState::Closed;
                Err(e)
            }
        }
    }

    /// Run the save hooks, persist the store and close.
    /// On failure the window stays open with its edits.
    pub fn commit(&mut self) -> Result<()> {
        let store = self.open_store("commit")?;
        self.state = WindowState::Committing;

        let saved = self
            .save_hooks
            .iter()
            .try_for_each(|hook| hook(store.as_ref()))
            .and_then(|()| store.save());
        if let Err(e) = saved {
            error!(title = %self.title, error = %e, "Commit failed, window stays open");
            self.state = WindowState::Open;
            return Err(e);
        }

        info!(title = %self.title, "Saved settings");
        self.teardown();
        Ok(())
    }

    /// Reload the store from storage, dropping every unsaved edit, and close.
    /// A storage failure keeps the window open.
    pub fn discard(&mut self) -> Result<()> {
        let store = self.open_store("discard")?;
        self.state = WindowState::Discarding;

        match store.load() {
            Ok(()) => {}
            // The reload happened; only some control could not show it
            Err(ConfigError::Listeners { key, failures }) => {
                warn!(title = %self.title, key = %key, failures = failures.len(), "Controls failed to refresh after discard");
            }
            Err(e) => {
                error!(title = %self.title, error = %e, "Discard failed, window stays open");
                self.state = WindowState::Open;
                return Err(e);
            }
        }

        info!(title = %self.title, "Discarded unsaved settings");
        self.teardown();
        Ok(())
    }

    /// Closing without committing discards. Closing a closed window is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            WindowState::Closed => Ok(()),
            _ => self.discard(),
        }
    }

    /// Replace the edited document with the defaults; saved on commit
    pub fn restore_defaults(&mut self) -> Result<()> {
        let store = self.open_store("restore defaults")?;
        store.restore_defaults()
    }

    /// Replace the edited document with raw JSON from the advanced editor
    pub fn apply_raw(&mut self, json: &str) -> Result<()> {
        let store = self.open_store("apply raw config")?;
        store.replace_document(parse_raw(json)?)
    }

    fn open_store(&self, operation: &'static str) -> Result<Rc<ConfigStore>> {
        self.expect_state(operation, WindowState::Open)?;
        self.open
            .as_ref()
            .map(|open| Rc::clone(&open.store))
            .ok_or_else(|| ConfigError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
    }

    fn expect_state(&self, operation: &'static str, expected: WindowState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ConfigError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn teardown(&mut self) {
        if let Some(open) = self.open.take() {
            for binding in &open.bindings {
                binding.detach();
            }
        }
        self.toolkit.close_window();
        self.state = WindowState::Closed;
    }
}

/// Parse advanced-editor text; the root must still be a mapping
pub(crate) fn parse_raw(json: &str) -> Result<Value> {
    serde_json::from_str(json).map_err(|e| {
        ConfigError::from(PersistenceError::InvalidFormat {
            path: PathBuf::from(RAW_EDITOR_SOURCE),
            reason: e.to_string(),
        })
    })
}

impl<T: Toolkit> fmt::Debug for WindowController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowController")
            .field("title", &self.title)
            .field("state", &self.state)
            .field("bindings", &self.binding_count())
            .field("save_hooks", &self.save_hooks.len())
            .finish()
    }
}
