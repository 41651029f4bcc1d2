//! A plugin's configuration, its settings layout and its settings window

use std::path::Path;
use std::rc::Rc;

use tracing::info;

use crate::config::{ConfigStore, JsonFileStorage, Result, load_defaults};
use crate::constants::window::TITLE_PREFIX;
use crate::layout::{ContainerNode, LayoutRegistry};
use crate::toolkit::{LabelSpec, Toolkit};
use crate::window::{self, WindowController};

/// Owns the store and hands it to every tab builder and binding
pub struct PluginSession<T: Toolkit> {
    name: String,
    store: Rc<ConfigStore>,
    layout: LayoutRegistry,
    window: WindowController<T>,
}

impl<T: Toolkit> PluginSession<T> {
    pub fn new(name: impl Into<String>, store: ConfigStore, toolkit: Rc<T>) -> Self {
        let name = name.into();
        let window = WindowController::new(toolkit, format!("{TITLE_PREFIX}{name}"));
        Self {
            name,
            store: Rc::new(store),
            layout: LayoutRegistry::new(),
            window,
        }
    }

    /// Session over a JSON config file and a shipped defaults file
    pub fn from_files(
        name: impl Into<String>,
        defaults_path: &Path,
        config_path: &Path,
        toolkit: Rc<T>,
    ) -> Result<Self> {
        let defaults = load_defaults(defaults_path)?;
        let storage = Rc::new(JsonFileStorage::new(config_path));
        let store = ConfigStore::new(defaults, storage)?;
        let session = Self::new(name, store, toolkit);
        info!(plugin = %session.name, config = %config_path.display(), "Plugin session ready");
        Ok(session)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Rc<ConfigStore> {
        &self.store
    }

    pub fn layout(&self) -> &LayoutRegistry {
        &self.layout
    }

    /// Replace the whole layout, e.g. with one inferred from the defaults
    pub fn set_layout(&mut self, layout: LayoutRegistry) {
        self.layout = layout;
    }

    pub fn add_tab(&mut self, name: &str) -> &mut ContainerNode {
        self.layout.add_tab(name)
    }

    /// Contribute a section to the tab called `name`, built each time the
    /// window opens. Sections from different callers appear in call order.
    pub fn add_config_tab<F>(&mut self, name: &str, builder: F)
    where
        F: Fn(&mut ContainerNode, &ConfigStore) -> Result<()> + 'static,
    {
        self.layout.add_tab(name).defer(builder);
    }

    pub fn set_footer(&mut self, footer: LabelSpec) {
        self.layout.set_footer(footer);
    }

    pub fn execute_on_save<F>(&mut self, hook: F)
    where
        F: Fn(&ConfigStore) -> Result<()> + 'static,
    {
        self.window.execute_on_save(hook);
    }

    pub fn window(&self) -> &WindowController<T> {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut WindowController<T> {
        &mut self.window
    }

    pub fn open_window(&mut self) -> Result<()> {
        self.window.open(&self.store, &self.layout)
    }

    /// Replace the current document with advanced-editor text and open the
    /// window over it. Lets a user repair a config the controls cannot show.
    pub fn open_with_raw(&mut self, json: &str) -> Result<()> {
        let document = window::parse_raw(json)?;
        self.store.replace_document(document)?;
        self.open_window()
    }

    pub fn commit(&mut self) -> Result<()> {
        self.window.commit()
    }

    pub fn discard(&mut self) -> Result<()> {
        self.window.discard()
    }
}

impl<T: Toolkit> std::fmt::Debug for PluginSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSession")
            .field("name", &self.name)
            .field("store", &self.store)
            .field("layout", &self.layout.tab_names())
            .field("window", &self.window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, MemoryStorage};
    use crate::layout::infer;
    use crate::toolkit::{ControlValue, HeadlessToolkit};
    use serde_json::json;
    use std::cell::Cell;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_window_title_uses_plugin_name() {
        let store = ConfigStore::in_memory(json!({})).unwrap();
        let session = PluginSession::new("Demo", store, Rc::new(HeadlessToolkit::new()));
        assert_eq!(session.window().title(), "Config for Demo");
    }

    #[test]
    fn test_features_share_general_tab() {
        let toolkit = Rc::new(HeadlessToolkit::new());
        let store = ConfigStore::in_memory(json!({"sync": true, "theme": "dark"})).unwrap();
        let mut session = PluginSession::new("Demo", store, Rc::clone(&toolkit));

        session.add_config_tab("General", |tab, _| {
            tab.checkbox("sync", "Sync on start")?;
            Ok(())
        });
        session.add_config_tab("General", |tab, _| {
            tab.dropdown(
                "theme",
                &["Light", "Dark"],
                vec![json!("light"), json!("dark")],
                "Theme",
            )?;
            Ok(())
        });

        session.open_window().unwrap();
        assert_eq!(session.layout().tab_names(), vec!["General"]);
        assert_eq!(
            toolkit.outline(),
            "\
window \"Config for Demo\"
  tab \"General\"
    checkbox \"Sync on start\" = true
    dropdown \"Theme\" = #1
"
        );

        toolkit
            .find_control("Theme")
            .unwrap()
            .user_change(ControlValue::Choice(Some(0)));
        assert_eq!(session.store().get("theme").unwrap(), json!("light"));
        session.discard().unwrap();
        assert_eq!(session.store().get("theme").unwrap(), json!("dark"));
    }

    #[test]
    fn test_unshowable_config_is_repaired_through_raw_json() {
        let toolkit = Rc::new(HeadlessToolkit::new());
        let storage = MemoryStorage::with_document(json!({"sync": "yes"}));
        let store = ConfigStore::new(json!({"sync": true}), Rc::new(storage.clone())).unwrap();
        let mut session = PluginSession::new("Demo", store, Rc::clone(&toolkit));
        session.add_config_tab("General", |tab, _| {
            tab.checkbox("sync", "Sync on start")?;
            Ok(())
        });

        let err = session.open_window().unwrap_err();
        assert!(matches!(err.root_cause(), ConfigError::BindingType { .. }));
        assert!(!session.window().is_open());

        assert!(session.open_with_raw("{ broken").is_err());
        assert!(!session.window().is_open());

        session.open_with_raw(r#"{"sync": false}"#).unwrap();
        assert!(session.window().is_open());
        assert_eq!(
            toolkit.outline(),
            "\
window \"Config for Demo\"
  tab \"General\"
    checkbox \"Sync on start\" = false
"
        );
        session.commit().unwrap();
        assert_eq!(storage.document(), Some(json!({"sync": false})));
    }

    #[test]
    fn test_file_backed_edit_save_and_reopen() {
        let dir = tempdir().unwrap();
        let defaults_path = dir.path().join("config.defaults.json");
        let config_path = dir.path().join("config.json");
        fs::write(
            &defaults_path,
            r##"{"sync": true, "display": {"opacity": 75, "tint": "#336699"}}"##,
        )
        .unwrap();

        let toolkit = Rc::new(HeadlessToolkit::new());
        let mut session =
            PluginSession::from_files("Demo", &defaults_path, &config_path, Rc::clone(&toolkit))
                .unwrap();
        session.set_layout(infer::from_defaults(session.store().defaults()).unwrap());

        let saves = Rc::new(Cell::new(0));
        let counter = Rc::clone(&saves);
        session.execute_on_save(move |store| {
            counter.set(counter.get() + 1);
            assert_eq!(store.get("sync")?, json!(false));
            Ok(())
        });

        session.open_window().unwrap();
        toolkit
            .find_control("Sync")
            .unwrap()
            .user_change(ControlValue::Bool(false));
        toolkit
            .find_control("Opacity")
            .unwrap()
            .user_change(ControlValue::Number(40.0));
        session.commit().unwrap();

        assert_eq!(saves.get(), 1);
        assert!(!toolkit.is_window_open());
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(written, json!({"sync": false, "display": {"opacity": 40}}));

        let reopened =
            PluginSession::from_files("Demo", &defaults_path, &config_path, Rc::new(HeadlessToolkit::new()))
                .unwrap();
        assert_eq!(reopened.store().get("display.opacity").unwrap(), json!(40));
        assert_eq!(reopened.store().get("display.tint").unwrap(), json!("#336699"));
    }

    #[test]
    fn test_discard_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let defaults_path = dir.path().join("config.defaults.json");
        let config_path = dir.path().join("config.json");
        fs::write(&defaults_path, r#"{"name": "demo"}"#).unwrap();
        fs::write(&config_path, r#"{"name": "saved"}"#).unwrap();

        let toolkit = Rc::new(HeadlessToolkit::new());
        let mut session =
            PluginSession::from_files("Demo", &defaults_path, &config_path, Rc::clone(&toolkit))
                .unwrap();
        session.set_layout(infer::from_defaults(session.store().defaults()).unwrap());
        session.open_window().unwrap();

        toolkit
            .find_control("Name")
            .unwrap()
            .user_change(ControlValue::Text("edited".into()));
        assert_eq!(session.store().get("name").unwrap(), json!("edited"));

        session.discard().unwrap();
        assert_eq!(session.store().get("name").unwrap(), json!("saved"));
        assert_eq!(fs::read_to_string(&config_path).unwrap(), r#"{"name": "saved"}"#);
    }
}
