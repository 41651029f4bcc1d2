//! Two-way link between one config key and one toolkit control
//!
//! A [`Binding`] pushes the stored value into its control when the store
//! changes, and writes user edits back into the store. Edits the coercion or
//! validator rejects are reverted at the control and never reach the store.

pub mod coerce;

use std::cell::Cell;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{
    ConfigError, ConfigPath, ConfigStore, ListenerId, ListenerScope, Result, ValidationError,
};
use crate::toolkit::{ControlKind, ControlValue, ToolkitControl};

pub use coerce::{Coercion, Validator};

/// What happened to a user edit
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// Written to the store
    Stored,
    /// Equal to the stored value; nothing written
    Unchanged,
    /// Rejected; the control shows the stored value again
    Rejected(ValidationError),
    /// The binding is detached or its store is gone
    Ignored,
}

pub struct Binding {
    shared: Rc<BindingShared>,
    listener: Cell<Option<ListenerId>>,
}

struct BindingShared {
    path: ConfigPath,
    store: Weak<ConfigStore>,
    control: Weak<dyn ToolkitControl>,
    coercion: Coercion,
    validator: Option<Validator>,
    active: Cell<bool>,
}

impl Binding {
    /// Bind `control` to `path`.
    ///
    /// Fails with [`ConfigError::BindingType`] when the stored value does not
    /// fit the coercion or validator; nothing is registered in that case.
    pub fn new(
        store: &Rc<ConfigStore>,
        path: ConfigPath,
        control: Rc<dyn ToolkitControl>,
        coercion: Coercion,
        validator: Option<Validator>,
    ) -> Result<Self> {
        let stored = store.get(&path)?;
        let displayed = coercion
            .to_control(&stored)
            .filter(|_| validator.as_ref().is_none_or(|v| v.accepts(&stored)))
            .ok_or_else(|| ConfigError::BindingType {
                key: path.to_string(),
                expected: expected(&coercion, validator.as_ref()),
                found: stored.clone(),
            })?;
        control.set_displayed_value(displayed);

        let shared = Rc::new(BindingShared {
            path: path.clone(),
            store: Rc::downgrade(store),
            control: Rc::downgrade(&control),
            coercion,
            validator,
            active: Cell::new(true),
        });

        let weak = Rc::downgrade(&shared);
        let listener = store.subscribe(ListenerScope::Overlapping(path.clone()), move |_| {
            weak.upgrade().map_or(Ok(()), |shared| shared.refresh())
        });

        let weak = Rc::downgrade(&shared);
        control.on_user_change(Box::new(move |raw| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            match shared.user_changed(raw) {
                Ok(outcome) => debug!(key = %shared.path, ?outcome, "Handled control edit"),
                Err(e) => warn!(key = %shared.path, error = %e, "Control edit failed"),
            }
        }));

        debug!(key = %path, listener = %listener, "Bound control");
        Ok(Self {
            shared,
            listener: Cell::new(Some(listener)),
        })
    }

    /// Bind with the coercion implied by the control kind
    pub fn for_kind(
        store: &Rc<ConfigStore>,
        path: ConfigPath,
        control: Rc<dyn ToolkitControl>,
        kind: &ControlKind,
        validator: Option<Validator>,
    ) -> Result<Self> {
        Self::new(store, path, control, Coercion::for_kind(kind), validator)
    }

    pub fn path(&self) -> &ConfigPath {
        &self.shared.path
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.get()
    }

    /// Handle a raw value from the control as if the user had entered it
    pub fn apply_user_value(&self, raw: ControlValue) -> Result<EditOutcome> {
        self.shared.user_changed(raw)
    }

    /// Re-read the store and update the control if it shows something else
    pub fn refresh(&self) -> Result<()> {
        self.shared.refresh()
    }

    /// Stop syncing. Safe to call more than once.
    pub fn detach(&self) {
        self.shared.active.set(false);
        if let Some(id) = self.listener.take()
            && let Some(store) = self.shared.store.upgrade()
        {
            store.remove_listener(id);
            debug!(key = %self.shared.path, listener = %id, "Detached binding");
        }
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("path", &self.shared.path)
            .field("coercion", &self.shared.coercion)
            .field("active", &self.shared.active.get())
            .finish()
    }
}

impl BindingShared {
    fn refresh(&self) -> Result<()> {
        if !self.active.get() {
            return Ok(());
        }
        let (Some(store), Some(control)) = (self.store.upgrade(), self.control.upgrade()) else {
            return Ok(());
        };
        let stored = match store.get(&self.path) {
            Ok(value) => value,
            Err(ConfigError::KeyNotFound { .. }) => {
                debug!(key = %self.path, "Bound key removed, keeping displayed value");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let displayed = self
            .coercion
            .to_control(&stored)
            .ok_or_else(|| ConfigError::BindingType {
                key: self.path.to_string(),
                expected: self.coercion.expected().to_string(),
                found: stored.clone(),
            })?;

        // Our own writes come back through the listener; skip those
        if control.displayed_value() != displayed {
            control.set_displayed_value(displayed);
        }
        Ok(())
    }

    fn user_changed(&self, raw: ControlValue) -> Result<EditOutcome> {
        if !self.active.get() {
            return Ok(EditOutcome::Ignored);
        }
        let Some(store) = self.store.upgrade() else {
            return Ok(EditOutcome::Ignored);
        };

        let value = match self.validate(&raw) {
            Ok(value) => value,
            Err(rejection) => {
                debug!(key = %self.path, error = %rejection, "Rejected control edit");
                self.revert(&store);
                return Ok(EditOutcome::Rejected(rejection));
            }
        };

        if store.get_or(&self.path, Value::Null)? == value {
            return Ok(EditOutcome::Unchanged);
        }
        store.set(&self.path, value)?;
        Ok(EditOutcome::Stored)
    }

    fn validate(&self, raw: &ControlValue) -> std::result::Result<Value, ValidationError> {
        let rejection = |found: String| ValidationError {
            key: self.path.to_string(),
            expected: expected(&self.coercion, self.validator.as_ref()),
            found,
        };
        let value = self
            .coercion
            .to_store(raw)
            .ok_or_else(|| rejection(format!("{raw:?}")))?;
        match &self.validator {
            Some(validator) if !validator.accepts(&value) => Err(rejection(value.to_string())),
            _ => Ok(value),
        }
    }

    fn revert(&self, store: &ConfigStore) {
        let Some(control) = self.control.upgrade() else {
            return;
        };
        let restored = store
            .get(&self.path)
            .ok()
            .and_then(|stored| self.coercion.to_control(&stored));
        match restored {
            Some(value) => control.set_displayed_value(value),
            None => warn!(key = %self.path, "No stored value to revert control to"),
        }
    }
}

fn expected(coercion: &Coercion, validator: Option<&Validator>) -> String {
    match validator {
        Some(validator) => format!("{} ({})", coercion.expected(), validator.expected()),
        None => coercion.expected().to_string(),
    }
}
