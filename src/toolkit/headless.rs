//! In-memory toolkit
//!
//! Keeps the materialized tree and control values without drawing anything.
//! Used by tests to drive user edits, and by the `layout` subcommand to print
//! what a settings window would contain.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Write as _};
use std::rc::Rc;

use serde::Serialize;

use super::{
    ControlSpec, ControlValue, LabelSpec, LayoutItem, Orientation, ScrollOptions,
    Toolkit, ToolkitContainer, ToolkitControl,
};

#[derive(Default)]
pub struct HeadlessToolkit {
    window: RefCell<Option<Rc<HeadlessContainer>>>,
    controls: RefCell<Vec<Rc<HeadlessControl>>>,
}

impl HeadlessToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_window_open(&self) -> bool {
        self.window.borrow().is_some()
    }

    /// Controls created for the current window, in creation order
    pub fn controls(&self) -> Vec<Rc<HeadlessControl>> {
        self.controls.borrow().clone()
    }

    pub fn control(&self, index: usize) -> Option<Rc<HeadlessControl>> {
        self.controls.borrow().get(index).cloned()
    }

    /// First control whose description matches
    pub fn find_control(&self, description: &str) -> Option<Rc<HeadlessControl>> {
        self.controls
            .borrow()
            .iter()
            .find(|control| control.spec.description.as_deref() == Some(description))
            .cloned()
    }

    pub fn snapshot(&self) -> Option<LayoutSnapshot> {
        self.window.borrow().as_ref().map(|root| root.snapshot())
    }

    /// Indented text rendering of the open window
    pub fn outline(&self) -> String {
        self.snapshot()
            .map(|snapshot| snapshot.to_string())
            .unwrap_or_default()
    }

    fn container(&self, kind: ContainerKind) -> Rc<HeadlessContainer> {
        Rc::new(HeadlessContainer {
            kind,
            children: RefCell::new(Vec::new()),
        })
    }
}

impl Toolkit for HeadlessToolkit {
    type Control = HeadlessControl;
    type Container = HeadlessContainer;

    fn create_window(&self, title: &str) -> Rc<HeadlessContainer> {
        let root = self.container(ContainerKind::Window(title.to_string()));
        self.controls.borrow_mut().clear();
        *self.window.borrow_mut() = Some(Rc::clone(&root));
        root
    }

    fn create_tab(&self, name: &str) -> Rc<HeadlessContainer> {
        self.container(ContainerKind::Tab(name.to_string()))
    }

    fn create_group(&self, orientation: Orientation) -> Rc<HeadlessContainer> {
        self.container(ContainerKind::Group(orientation))
    }

    fn create_scroll_region(&self, options: ScrollOptions) -> Rc<HeadlessContainer> {
        self.container(ContainerKind::Scroll(options))
    }

    fn create_control(&self, spec: &ControlSpec) -> Rc<HeadlessControl> {
        let mut controls = self.controls.borrow_mut();
        let control = Rc::new(HeadlessControl {
            index: controls.len(),
            spec: spec.clone(),
            value: RefCell::new(spec.kind.initial_value()),
            callbacks: RefCell::new(Vec::new()),
            programmatic_updates: Cell::new(0),
        });
        controls.push(Rc::clone(&control));
        control
    }

    fn close_window(&self) {
        self.window.borrow_mut().take();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContainerKind {
    Window(String),
    Tab(String),
    Group(Orientation),
    Scroll(ScrollOptions),
}

pub struct HeadlessContainer {
    kind: ContainerKind,
    children: RefCell<Vec<LayoutItem<HeadlessToolkit>>>,
}

impl HeadlessContainer {
    pub fn kind(&self) -> &ContainerKind {
        &self.kind
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    fn snapshot(&self) -> LayoutSnapshot {
        let children = self
            .children
            .borrow()
            .iter()
            .map(|item| match item {
                LayoutItem::Container(container) => container.snapshot(),
                LayoutItem::Control(control) => LayoutSnapshot::Control {
                    index: control.index,
                    spec: control.spec.clone(),
                    value: control.displayed_value(),
                },
                LayoutItem::Label(label) => LayoutSnapshot::Label(label.clone()),
                LayoutItem::Space(amount) => LayoutSnapshot::Space(*amount),
                LayoutItem::Stretch(weight) => LayoutSnapshot::Stretch(*weight),
            })
            .collect();

        match &self.kind {
            ContainerKind::Window(title) => LayoutSnapshot::Window {
                title: title.clone(),
                children,
            },
            ContainerKind::Tab(name) => LayoutSnapshot::Tab {
                name: name.clone(),
                children,
            },
            ContainerKind::Group(orientation) => LayoutSnapshot::Group {
                orientation: *orientation,
                children,
            },
            ContainerKind::Scroll(options) => LayoutSnapshot::Scroll {
                options: *options,
                children,
            },
        }
    }
}

impl ToolkitContainer<HeadlessToolkit> for HeadlessContainer {
    fn add_child(&self, item: LayoutItem<HeadlessToolkit>) {
        self.children.borrow_mut().push(item);
    }
}

pub struct HeadlessControl {
    index: usize,
    spec: ControlSpec,
    value: RefCell<ControlValue>,
    callbacks: RefCell<Vec<Rc<dyn Fn(ControlValue)>>>,
    programmatic_updates: Cell<usize>,
}

impl HeadlessControl {
    pub fn spec(&self) -> &ControlSpec {
        &self.spec
    }

    /// How many times the core pushed a value into this control
    pub fn programmatic_updates(&self) -> usize {
        self.programmatic_updates.get()
    }

    /// Simulate the user editing the control
    pub fn user_change(&self, value: ControlValue) {
        *self.value.borrow_mut() = value.clone();
        let callbacks = self.callbacks.borrow().clone();
        for callback in callbacks {
            callback(value.clone());
        }
    }
}

impl ToolkitControl for HeadlessControl {
    fn displayed_value(&self) -> ControlValue {
        self.value.borrow().clone()
    }

    fn set_displayed_value(&self, value: ControlValue) {
        self.programmatic_updates.set(self.programmatic_updates.get() + 1);
        *self.value.borrow_mut() = value;
    }

    fn on_user_change(&self, callback: Box<dyn Fn(ControlValue)>) {
        self.callbacks.borrow_mut().push(Rc::from(callback));
    }
}

/// Serializable view of a materialized window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum LayoutSnapshot {
    Window {
        title: String,
        children: Vec<LayoutSnapshot>,
    },
    Tab {
        name: String,
        children: Vec<LayoutSnapshot>,
    },
    Group {
        orientation: Orientation,
        children: Vec<LayoutSnapshot>,
    },
    Scroll {
        options: ScrollOptions,
        children: Vec<LayoutSnapshot>,
    },
    Control {
        index: usize,
        spec: ControlSpec,
        value: ControlValue,
    },
    Label(LabelSpec),
    Space(f32),
    Stretch(u32),
}

impl LayoutSnapshot {
    fn write_outline(&self, out: &mut impl fmt::Write, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let children = match self {
            LayoutSnapshot::Window { title, children } => {
                writeln!(out, "{indent}window {title:?}")?;
                children
            }
            LayoutSnapshot::Tab { name, children } => {
                writeln!(out, "{indent}tab {name:?}")?;
                children
            }
            LayoutSnapshot::Group {
                orientation,
                children,
            } => {
                writeln!(out, "{indent}group {orientation:?}")?;
                children
            }
            LayoutSnapshot::Scroll { children, .. } => {
                writeln!(out, "{indent}scroll")?;
                children
            }
            LayoutSnapshot::Control { spec, value, .. } => {
                let description = spec.description.as_deref().unwrap_or("");
                return writeln!(
                    out,
                    "{indent}{} {description:?} = {}",
                    spec.kind.name(),
                    format_value(value)
                );
            }
            LayoutSnapshot::Label(label) => {
                return writeln!(out, "{indent}label {:?}", label.text);
            }
            LayoutSnapshot::Space(amount) => return writeln!(out, "{indent}space {amount}"),
            LayoutSnapshot::Stretch(weight) => return writeln!(out, "{indent}stretch {weight}"),
        };
        for child in children {
            child.write_outline(out, depth + 1)?;
        }
        Ok(())
    }
}

/// Indented outline, one node per line
impl fmt::Display for LayoutSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outline(f, 0)
    }
}

fn format_value(value: &ControlValue) -> String {
    match value {
        ControlValue::Bool(checked) => checked.to_string(),
        ControlValue::Text(text) => format!("{text:?}"),
        ControlValue::Choice(Some(index)) => format!("#{index}"),
        ControlValue::Choice(None) => "-".to_string(),
        ControlValue::Number(number) => number.to_string(),
        ControlValue::Color([r, g, b]) => format!("#{r:02x}{g:02x}{b:02x}"),
    }
}
