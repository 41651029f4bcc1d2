//! Declarative settings layout
//!
//! Plugin code describes tabs, groups and controls up front, or registers
//! builders that run when a window opens. Nothing touches the toolkit until
//! [`LayoutRegistry::materialize`] walks the tree, creates the widgets and
//! binds every control to its config key.

pub mod infer;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::debug;

use crate::binding::{Binding, Validator};
use crate::config::{ConfigError, ConfigPath, ConfigStore, Result};
use crate::toolkit::{
    ControlKind, ControlSpec, LabelSpec, LayoutItem, NumberRange, Orientation, ScrollOptions,
    Toolkit, ToolkitContainer, ToolkitControl,
};

/// Runs at materialization against a fresh section of its container
pub type Builder = Rc<dyn Fn(&mut ContainerNode, &ConfigStore) -> Result<()>>;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Tab(String),
    Group(Orientation),
    ScrollRegion(ScrollOptions),
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Tab(name) => write!(f, "tab '{name}'"),
            NodeKind::Group(Orientation::Horizontal) => write!(f, "horizontal group"),
            NodeKind::Group(Orientation::Vertical) => write!(f, "vertical group"),
            NodeKind::ScrollRegion(_) => write!(f, "scroll region"),
        }
    }
}

#[derive(Clone)]
enum Child {
    Container(ContainerNode),
    Control {
        spec: ControlSpec,
        path: ConfigPath,
        handle: ControlHandle,
        validator: Option<Validator>,
    },
    Label(LabelSpec),
    Space(f32),
    Stretch(u32),
    Deferred(Builder),
}

/// A tab, group or scroll region and its children, in insertion order
#[derive(Clone)]
pub struct ContainerNode {
    kind: NodeKind,
    children: Vec<Child>,
    materialized: bool,
}

impl ContainerNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            materialized: false,
        }
    }

    pub fn tab(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Tab(name.into()))
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    /// Append a nested group and return it for further building
    pub fn add_group(&mut self, orientation: Orientation) -> &mut ContainerNode {
        self.push_container(NodeKind::Group(orientation))
    }

    pub fn add_scroll_region(&mut self, options: ScrollOptions) -> &mut ContainerNode {
        self.push_container(NodeKind::ScrollRegion(options))
    }

    /// Append a control bound to `key`. The key is checked now; the stored
    /// value is checked when the window opens.
    pub fn add_control(&mut self, spec: ControlSpec, key: &str) -> Result<ControlHandle> {
        self.add_validated_control(spec, key, None)
    }

    pub fn add_validated_control(
        &mut self,
        spec: ControlSpec,
        key: &str,
        validator: Option<Validator>,
    ) -> Result<ControlHandle> {
        let path = ConfigPath::parse(key)?;
        let handle = ControlHandle::new(path.clone());
        self.children.push(Child::Control {
            spec,
            path,
            handle: handle.clone(),
            validator,
        });
        Ok(handle)
    }

    pub fn checkbox(&mut self, key: &str, description: &str) -> Result<ControlHandle> {
        self.add_control(
            ControlSpec::new(ControlKind::Checkbox).description(description),
            key,
        )
    }

    /// Dropdown showing `labels`, storing the matching entry of `values`
    pub fn dropdown(
        &mut self,
        key: &str,
        labels: &[&str],
        values: Vec<Value>,
        description: &str,
    ) -> Result<ControlHandle> {
        let labels = labels.iter().map(|label| label.to_string()).collect();
        self.add_control(
            ControlSpec::new(ControlKind::Dropdown { labels, values }).description(description),
            key,
        )
    }

    pub fn text_input(&mut self, key: &str, description: &str) -> Result<ControlHandle> {
        self.add_control(
            ControlSpec::new(ControlKind::TextInput).description(description),
            key,
        )
    }

    pub fn number_input(
        &mut self,
        key: &str,
        range: NumberRange,
        description: &str,
    ) -> Result<ControlHandle> {
        self.add_control(
            ControlSpec::new(ControlKind::NumberInput(range)).description(description),
            key,
        )
    }

    pub fn color_input(&mut self, key: &str, description: &str) -> Result<ControlHandle> {
        self.add_control(
            ControlSpec::new(ControlKind::ColorInput).description(description),
            key,
        )
    }

    /// File picker, or directory picker when `directory` is set.
    /// `filter` uses the `Images (*.png *.jpg)` form.
    pub fn path_input(
        &mut self,
        key: &str,
        directory: bool,
        filter: &str,
        description: &str,
    ) -> Result<ControlHandle> {
        self.add_control(
            ControlSpec::new(ControlKind::PathInput {
                directory,
                filter: filter.to_string(),
            })
            .description(description),
            key,
        )
    }

    pub fn add_label(&mut self, label: LabelSpec) {
        self.children.push(Child::Label(label));
    }

    pub fn text(&mut self, text: &str) {
        self.add_label(LabelSpec::new(text));
    }

    pub fn add_space(&mut self, amount: f32) {
        self.children.push(Child::Space(amount));
    }

    pub fn add_stretch(&mut self, weight: u32) {
        self.children.push(Child::Stretch(weight));
    }

    /// Register `builder` to populate this container when it is materialized.
    /// Its children land where the builder was registered, after anything
    /// added before it and before anything added after it.
    pub fn defer<F>(&mut self, builder: F)
    where
        F: Fn(&mut ContainerNode, &ConfigStore) -> Result<()> + 'static,
    {
        self.children.push(Child::Deferred(Rc::new(builder)));
    }

    fn push_container(&mut self, kind: NodeKind) -> &mut ContainerNode {
        self.children.push(Child::Container(ContainerNode::new(kind)));
        match self.children.last_mut() {
            Some(Child::Container(node)) => node,
            _ => unreachable!("container was just pushed"),
        }
    }

    /// Create the toolkit container for this node and everything below it.
    /// Every created binding is appended to `bindings`.
    pub fn materialize<T: Toolkit>(
        &mut self,
        toolkit: &T,
        store: &Rc<ConfigStore>,
        bindings: &mut Vec<Binding>,
    ) -> Result<Rc<T::Container>> {
        if self.materialized {
            return Err(ConfigError::AlreadyMaterialized {
                node: self.kind.to_string(),
            });
        }
        self.materialized = true;

        let container = match &self.kind {
            NodeKind::Tab(name) => toolkit.create_tab(name),
            NodeKind::Group(orientation) => toolkit.create_group(*orientation),
            NodeKind::ScrollRegion(options) => toolkit.create_scroll_region(*options),
        };
        self.populate(toolkit, &container, store, bindings)?;
        Ok(container)
    }

    fn populate<T: Toolkit>(
        &mut self,
        toolkit: &T,
        container: &Rc<T::Container>,
        store: &Rc<ConfigStore>,
        bindings: &mut Vec<Binding>,
    ) -> Result<()> {
        for child in &mut self.children {
            match child {
                Child::Container(node) => {
                    let nested = node.materialize(toolkit, store, bindings)?;
                    container.add_child(LayoutItem::Container(nested));
                }
                Child::Control {
                    spec,
                    path,
                    handle,
                    validator,
                } => {
                    let control = toolkit.create_control(spec);
                    let bound: Rc<dyn ToolkitControl> = control.clone();
                    bindings.push(Binding::for_kind(
                        store,
                        path.clone(),
                        Rc::clone(&bound),
                        &spec.kind,
                        validator.clone(),
                    )?);
                    handle.fill(&bound);
                    container.add_child(LayoutItem::Control(control));
                }
                Child::Label(label) => container.add_child(LayoutItem::Label(label.clone())),
                Child::Space(amount) => container.add_child(LayoutItem::Space(*amount)),
                Child::Stretch(weight) => container.add_child(LayoutItem::Stretch(*weight)),
                Child::Deferred(builder) => {
                    let mut section = ContainerNode::new(self.kind.clone());
                    builder(&mut section, store.as_ref())?;
                    debug!(node = %self.kind, children = section.len(), "Ran deferred builder");
                    section.populate(toolkit, container, store, bindings)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ContainerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerNode")
            .field("kind", &self.kind)
            .field("children", &self.children.len())
            .field("materialized", &self.materialized)
            .finish()
    }
}

/// The live control behind an `add_control` call, once a window is open
#[derive(Clone)]
pub struct ControlHandle {
    path: ConfigPath,
    slot: Rc<RefCell<Option<Weak<dyn ToolkitControl>>>>,
}

impl ControlHandle {
    fn new(path: ConfigPath) -> Self {
        Self {
            path,
            slot: Rc::new(RefCell::new(None)),
        }
    }

    pub fn path(&self) -> &ConfigPath {
        &self.path
    }

    /// The control created by the most recent materialization, while the
    /// toolkit still holds it
    pub fn control(&self) -> Option<Rc<dyn ToolkitControl>> {
        self.slot.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn is_materialized(&self) -> bool {
        self.control().is_some()
    }

    fn fill(&self, control: &Rc<dyn ToolkitControl>) {
        *self.slot.borrow_mut() = Some(Rc::downgrade(control));
    }
}

impl fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlHandle")
            .field("path", &self.path)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}

/// Named tabs shared by every feature that contributes settings
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    tabs: Vec<ContainerNode>,
    footer: Option<LabelSpec>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tab called `name`, created at the end if it does not exist yet
    pub fn add_tab(&mut self, name: &str) -> &mut ContainerNode {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                self.tabs.push(ContainerNode::tab(name));
                self.tabs.len() - 1
            }
        };
        &mut self.tabs[index]
    }

    pub fn tab(&self, name: &str) -> Option<&ContainerNode> {
        self.position(name).map(|index| &self.tabs[index])
    }

    pub fn tab_names(&self) -> Vec<&str> {
        self.tabs
            .iter()
            .filter_map(|tab| match &tab.kind {
                NodeKind::Tab(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Text shown under the tabs
    pub fn set_footer(&mut self, footer: LabelSpec) {
        self.footer = Some(footer);
    }

    pub fn footer(&self) -> Option<&LabelSpec> {
        self.footer.as_ref()
    }

    /// Build a fresh copy of every tab into `root`.
    ///
    /// The registered templates are untouched, so each window opening gets
    /// its own instance. On failure the bindings created so far are dropped,
    /// which detaches them.
    pub fn materialize<T: Toolkit>(
        &self,
        toolkit: &T,
        root: &Rc<T::Container>,
        store: &Rc<ConfigStore>,
    ) -> Result<Vec<Binding>> {
        let mut bindings = Vec::new();
        for template in &self.tabs {
            let mut tab = template.clone();
            let container = tab
                .materialize(toolkit, store, &mut bindings)
                .map_err(|source| ConfigError::Builder {
                    tab: tab_name(template),
                    source: Box::new(source),
                })?;
            root.add_child(LayoutItem::Container(container));
        }
        if let Some(footer) = &self.footer {
            root.add_child(LayoutItem::Label(footer.clone()));
        }
        debug!(tabs = self.tabs.len(), bindings = bindings.len(), "Materialized layout");
        Ok(bindings)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tabs
            .iter()
            .position(|tab| matches!(&tab.kind, NodeKind::Tab(existing) if existing == name))
    }
}

fn tab_name(node: &ContainerNode) -> String {
    match &node.kind {
        NodeKind::Tab(name) => name.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::{ControlValue, HeadlessToolkit};
    use serde_json::json;

    fn store(defaults: Value) -> Rc<ConfigStore> {
        Rc::new(ConfigStore::in_memory(defaults).unwrap())
    }

    #[test]
    fn test_add_tab_returns_existing_tab() {
        let mut registry = LayoutRegistry::new();
        registry.add_tab("General").text("first");
        registry.add_tab("Colors");
        registry.add_tab("General").text("second");

        assert_eq!(registry.tab_names(), vec!["General", "Colors"]);
        assert_eq!(registry.tab("General").map(ContainerNode::len), Some(2));
    }

    #[test]
    fn test_invalid_key_fails_at_registration() {
        let mut registry = LayoutRegistry::new();
        let result = registry.add_tab("General").checkbox("a..b", "Broken");
        assert!(matches!(result, Err(ConfigError::InvalidPath { .. })));
    }

    #[test]
    fn test_materialize_preserves_order_and_binds() {
        let store = store(json!({"name": "demo", "enabled": true}));
        let toolkit = HeadlessToolkit::new();
        let mut registry = LayoutRegistry::new();
        let tab = registry.add_tab("General");
        let row = tab.add_group(Orientation::Horizontal);
        row.text("Name");
        row.add_space(7.0);
        let name = row.text_input("name", "Name").unwrap();
        row.add_stretch(1);
        let enabled = tab.checkbox("enabled", "Enabled").unwrap();
        registry.set_footer(LabelSpec::new("v1.0"));

        assert!(!name.is_materialized());
        let root = toolkit.create_window("Config for Demo");
        let bindings = registry.materialize(&toolkit, &root, &store).unwrap();

        assert_eq!(bindings.len(), 2);
        assert_eq!(
            name.control().map(|c| c.displayed_value()),
            Some(ControlValue::Text("demo".into()))
        );
        assert_eq!(enabled.path().to_string(), "enabled");
        assert_eq!(
            toolkit.outline(),
            "\
window \"Config for Demo\"
  tab \"General\"
    group Horizontal
      label \"Name\"
      space 7
      text input \"Name\" = \"demo\"
      stretch 1
    checkbox \"Enabled\" = true
  label \"v1.0\"
"
        );
        assert!(!registry.tab("General").unwrap().is_materialized());
    }

    #[test]
    fn test_deferred_builders_run_in_registration_order() {
        let store = store(json!({"a": true, "b": true}));
        let toolkit = HeadlessToolkit::new();
        let mut registry = LayoutRegistry::new();

        registry.add_tab("General").text("header");
        registry.add_tab("General").defer(|section, _| {
            section.checkbox("a", "A")?;
            Ok(())
        });
        registry.add_tab("General").defer(|section, store| {
            let label = format!("b is {}", store.get("b")?);
            section.text(&label);
            section.checkbox("b", "B")?;
            Ok(())
        });
        registry.add_tab("General").text("footer");

        let root = toolkit.create_window("T");
        registry.materialize(&toolkit, &root, &store).unwrap();
        assert_eq!(
            toolkit.outline(),
            "\
window \"T\"
  tab \"General\"
    label \"header\"
    checkbox \"A\" = true
    label \"b is true\"
    checkbox \"B\" = true
    label \"footer\"
"
        );
    }

    #[test]
    fn test_deferred_builder_inside_scroll_region_group() {
        let store = store(json!({"size": 5, "on": false}));
        let toolkit = HeadlessToolkit::new();
        let mut registry = LayoutRegistry::new();

        let scroll = registry
            .add_tab("Display")
            .add_scroll_region(ScrollOptions::default());
        scroll.text("top");
        let group = scroll.add_group(Orientation::Vertical);
        group.text("before");
        group.defer(|section, store| {
            let range = NumberRange {
                min: 0.0,
                max: 10.0,
                ..NumberRange::default()
            };
            section.number_input("size", range, "Size")?;
            if store.get("on")? == json!(false) {
                section.text("off");
            }
            section.checkbox("on", "On")?;
            Ok(())
        });
        group.text("after");
        scroll.text("bottom");

        let root = toolkit.create_window("T");
        let bindings = registry.materialize(&toolkit, &root, &store).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(
            toolkit.outline(),
            "\
window \"T\"
  tab \"Display\"
    scroll
      label \"top\"
      group Vertical
        label \"before\"
        number input \"Size\" = 5
        label \"off\"
        checkbox \"On\" = false
        label \"after\"
      label \"bottom\"
"
        );

        toolkit
            .find_control("Size")
            .unwrap()
            .user_change(ControlValue::Number(8.0));
        assert_eq!(store.get("size").unwrap(), json!(8));
        assert!(!registry.tab("Display").unwrap().is_materialized());
    }

    #[test]
    fn test_builders_run_once_per_materialization() {
        let store = store(json!({}));
        let toolkit = HeadlessToolkit::new();
        let runs = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&runs);
        let mut registry = LayoutRegistry::new();
        registry.add_tab("General").defer(move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        for expected in 1..=2 {
            let root = toolkit.create_window("T");
            registry.materialize(&toolkit, &root, &store).unwrap();
            assert_eq!(runs.get(), expected);
        }
    }

    #[test]
    fn test_materializing_a_node_twice_fails() {
        let store = store(json!({}));
        let toolkit = HeadlessToolkit::new();
        let mut node = ContainerNode::tab("General");
        let mut bindings = Vec::new();
        node.materialize(&toolkit, &store, &mut bindings).unwrap();
        assert!(matches!(
            node.materialize(&toolkit, &store, &mut bindings),
            Err(ConfigError::AlreadyMaterialized { .. })
        ));
    }

    #[test]
    fn test_failed_materialize_detaches_partial_bindings() {
        let store = store(json!({"ok": true, "bad": "text"}));
        let toolkit = HeadlessToolkit::new();
        let mut registry = LayoutRegistry::new();
        registry.add_tab("General").checkbox("ok", "Ok").unwrap();
        registry.add_tab("Other").checkbox("bad", "Bad").unwrap();

        let root = toolkit.create_window("T");
        let err = registry.materialize(&toolkit, &root, &store).unwrap_err();
        assert!(matches!(&err, ConfigError::Builder { tab, .. } if tab == "Other"));
        assert!(matches!(err.root_cause(), ConfigError::BindingType { .. }));
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_builder_error_aborts() {
        let store = store(json!({}));
        let toolkit = HeadlessToolkit::new();
        let mut registry = LayoutRegistry::new();
        registry
            .add_tab("General")
            .defer(|_, store| store.get("missing").map(|_| ()));

        let root = toolkit.create_window("T");
        let err = registry.materialize(&toolkit, &root, &store).unwrap_err();
        assert!(matches!(err.root_cause(), ConfigError::KeyNotFound { .. }));
    }
}
