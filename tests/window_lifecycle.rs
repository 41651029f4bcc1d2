use std::cell::RefCell;
use std::rc::Rc;

use plugin_settings::config::{ConfigError, ConfigStore, MemoryStorage, PersistenceError};
use plugin_settings::toolkit::{
    ControlValue, HeadlessToolkit, LabelSpec, NumberRange, Orientation, ToolkitControl,
};
use plugin_settings::{PluginSession, WindowState};
use serde_json::{Value, json};

fn session(
    saved: Value,
) -> (PluginSession<HeadlessToolkit>, Rc<HeadlessToolkit>, MemoryStorage) {
    let defaults = json!({
        "enabled": true,
        "apple": {"color": "#ff0000", "count": 3}
    });
    let storage = MemoryStorage::with_document(saved);
    let store = ConfigStore::new(defaults, Rc::new(storage.clone())).unwrap();
    let toolkit = Rc::new(HeadlessToolkit::new());
    let mut session = PluginSession::new("Fruit", store, Rc::clone(&toolkit));

    session.add_config_tab("General", |tab, _| {
        tab.checkbox("enabled", "Enabled")?;
        Ok(())
    });
    session.add_config_tab("Apple", |tab, store| {
        let group = tab.add_group(Orientation::Horizontal);
        group.color_input("apple.color", "Color")?;
        let range = NumberRange {
            min: 0.0,
            max: 10.0,
            ..NumberRange::default()
        };
        group.number_input("apple.count", range, "Count")?;
        if store.get("enabled")? == json!(false) {
            tab.text("Apples are disabled");
        }
        Ok(())
    });
    session.set_footer(LabelSpec::new("Changes apply after restart"));
    (session, toolkit, storage)
}

#[test]
fn test_edit_commit_persists_only_touched_keys() {
    let (mut session, toolkit, storage) = session(json!({}));
    session.open_window().unwrap();
    assert_eq!(session.window().state(), WindowState::Open);
    assert_eq!(session.window().binding_count(), 3);

    toolkit
        .find_control("Color")
        .unwrap()
        .user_change(ControlValue::Color([0, 255, 0]));
    session.commit().unwrap();

    assert_eq!(session.window().state(), WindowState::Closed);
    assert_eq!(storage.document(), Some(json!({"apple": {"color": "#00ff00"}})));
}

#[test]
fn test_out_of_range_edit_is_reverted() {
    let (mut session, toolkit, _) = session(json!({}));
    session.open_window().unwrap();

    let count = toolkit.find_control("Count").unwrap();
    count.user_change(ControlValue::Number(42.0));

    assert_eq!(count.displayed_value(), ControlValue::Number(3.0));
    assert_eq!(session.store().get("apple.count").unwrap(), json!(3));
    assert!(!session.store().has_unsaved_changes());
}

#[test]
fn test_each_opening_runs_builders_against_current_values() {
    let (mut session, toolkit, _) = session(json!({"enabled": false}));
    session.open_window().unwrap();
    assert!(toolkit.outline().contains("label \"Apples are disabled\""));
    assert!(toolkit.outline().ends_with("label \"Changes apply after restart\"\n"));

    toolkit
        .find_control("Enabled")
        .unwrap()
        .user_change(ControlValue::Bool(true));
    session.commit().unwrap();

    session.open_window().unwrap();
    assert!(!toolkit.outline().contains("Apples are disabled"));
}

#[test]
fn test_failed_save_keeps_window_open() {
    let (mut session, toolkit, storage) = session(json!({}));
    session.open_window().unwrap();
    toolkit
        .find_control("Enabled")
        .unwrap()
        .user_change(ControlValue::Bool(false));

    storage.set_read_only(true);
    let err = session.commit().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Persistence(PersistenceError::Unavailable { .. })
    ));
    assert_eq!(session.window().state(), WindowState::Open);

    storage.set_read_only(false);
    session.commit().unwrap();
    assert_eq!(storage.document(), Some(json!({"enabled": false})));
}

#[test]
fn test_save_hook_failure_aborts_commit() {
    let (mut session, _, storage) = session(json!({}));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    session.execute_on_save(move |store| {
        log.borrow_mut().push(store.get("apple.count")?);
        Err(ConfigError::KeyNotFound {
            key: "hook".to_string(),
        })
    });

    session.open_window().unwrap();
    assert!(session.commit().is_err());
    assert!(session.window().is_open());
    assert_eq!(*seen.borrow(), vec![json!(3)]);
    assert_eq!(storage.document(), Some(json!({})));
}

#[test]
fn test_restore_defaults_and_raw_edit_refresh_controls() {
    let (mut session, toolkit, _) = session(json!({"apple": {"count": 7}}));
    session.open_window().unwrap();

    let count = toolkit.find_control("Count").unwrap();
    assert_eq!(count.displayed_value(), ControlValue::Number(7.0));

    session.window_mut().restore_defaults().unwrap();
    assert_eq!(count.displayed_value(), ControlValue::Number(3.0));

    session
        .window_mut()
        .apply_raw(r#"{"apple": {"count": 5}}"#)
        .unwrap();
    assert_eq!(count.displayed_value(), ControlValue::Number(5.0));

    assert!(session.window_mut().apply_raw("[1, 2]").is_err());
    assert!(session.window_mut().apply_raw("{ nope").is_err());
    assert_eq!(count.displayed_value(), ControlValue::Number(5.0));

    session.discard().unwrap();
    assert_eq!(session.store().get("apple.count").unwrap(), json!(7));
}

#[test]
fn test_operations_need_an_open_window() {
    let (mut session, _, _) = session(json!({}));
    assert!(matches!(
        session.commit(),
        Err(ConfigError::InvalidState { .. })
    ));
    session.window_mut().close().unwrap();
    assert_eq!(session.window().state(), WindowState::Closed);
}
