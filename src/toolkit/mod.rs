//! UI toolkit surface consumed by the layout and binding layers
//!
//! The core never draws anything. A toolkit creates opaque containers and
//! controls; the core arranges them and keeps control values in sync with
//! the [`ConfigStore`](crate::config::ConfigStore).

pub mod headless;

use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

pub use headless::HeadlessToolkit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Which axes scroll independently of the parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollOptions {
    pub horizontal: bool,
    pub vertical: bool,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            horizontal: true,
            vertical: true,
        }
    }
}

/// Static text; carries no config key
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelSpec {
    pub text: String,
    pub bold: bool,
    /// Pixel size, toolkit default when `None`
    pub size: Option<f32>,
    pub multiline: bool,
    pub tooltip: Option<String>,
}

impl LabelSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

/// Bounds for a number input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumberRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Accept fractional values
    pub decimal: bool,
    /// Digits shown after the decimal point when `decimal` is set
    pub precision: usize,
}

impl Default for NumberRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 99.0,
            step: 1.0,
            decimal: false,
            precision: 2,
        }
    }
}

/// What a control edits and how its value is shaped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlKind {
    Checkbox,
    Dropdown {
        labels: Vec<String>,
        values: Vec<Value>,
    },
    TextInput,
    NumberInput(NumberRange),
    ColorInput,
    PathInput {
        directory: bool,
        filter: String,
    },
}

impl ControlKind {
    pub fn name(&self) -> &'static str {
        match self {
            ControlKind::Checkbox => "checkbox",
            ControlKind::Dropdown { .. } => "dropdown",
            ControlKind::TextInput => "text input",
            ControlKind::NumberInput(_) => "number input",
            ControlKind::ColorInput => "color input",
            ControlKind::PathInput { .. } => "path input",
        }
    }

    /// What a control shows before a binding pushes a stored value into it
    pub fn initial_value(&self) -> ControlValue {
        match self {
            ControlKind::Checkbox => ControlValue::Bool(false),
            ControlKind::Dropdown { .. } => ControlValue::Choice(None),
            ControlKind::TextInput | ControlKind::PathInput { .. } => {
                ControlValue::Text(String::new())
            }
            ControlKind::NumberInput(range) => ControlValue::Number(range.min),
            ControlKind::ColorInput => ControlValue::Color([0, 0, 0]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlSpec {
    #[serde(flatten)]
    pub kind: ControlKind,
    pub description: Option<String>,
    pub tooltip: Option<String>,
}

impl ControlSpec {
    pub fn new(kind: ControlKind) -> Self {
        Self {
            kind,
            description: None,
            tooltip: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

/// Value as a control displays it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ControlValue {
    Bool(bool),
    Text(String),
    /// Selected index of a dropdown
    Choice(Option<usize>),
    Number(f64),
    Color([u8; 3]),
}

/// A control created by a toolkit
pub trait ToolkitControl {
    fn displayed_value(&self) -> ControlValue;

    /// Programmatic update; must not fire user-change callbacks
    fn set_displayed_value(&self, value: ControlValue);

    /// Called with the raw control value whenever the user edits it
    fn on_user_change(&self, callback: Box<dyn Fn(ControlValue)>);
}

/// Child of a container, in rendering order
pub enum LayoutItem<T: Toolkit> {
    Container(Rc<T::Container>),
    Control(Rc<T::Control>),
    Label(LabelSpec),
    Space(f32),
    Stretch(u32),
}

pub trait ToolkitContainer<T: Toolkit> {
    fn add_child(&self, item: LayoutItem<T>);
}

pub trait Toolkit: Sized {
    type Control: ToolkitControl + 'static;
    type Container: ToolkitContainer<Self> + 'static;

    /// Root container of a settings window
    fn create_window(&self, title: &str) -> Rc<Self::Container>;
    fn create_tab(&self, name: &str) -> Rc<Self::Container>;
    fn create_group(&self, orientation: Orientation) -> Rc<Self::Container>;
    fn create_scroll_region(&self, options: ScrollOptions) -> Rc<Self::Container>;
    fn create_control(&self, spec: &ControlSpec) -> Rc<Self::Control>;

    /// Tear down whatever `create_window` built
    fn close_window(&self);
}
