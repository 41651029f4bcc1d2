//! Retained widget tree drawn by egui every frame
//!
//! egui is immediate mode, so containers and controls only hold what is
//! needed to draw them again: their spec and the value currently shown.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::toolkit::{
    ControlSpec, ControlValue, LayoutItem, Orientation, ScrollOptions, Toolkit, ToolkitContainer,
    ToolkitControl,
};

#[derive(Default)]
pub struct EguiToolkit {
    window: RefCell<Option<Rc<EguiContainer>>>,
    next_id: Cell<usize>,
}

impl EguiToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(&self) -> Option<Rc<EguiContainer>> {
        self.window.borrow().clone()
    }

    fn next_id(&self) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn container(&self, kind: EguiContainerKind) -> Rc<EguiContainer> {
        Rc::new(EguiContainer {
            id: self.next_id(),
            kind,
            children: RefCell::new(Vec::new()),
        })
    }
}

impl Toolkit for EguiToolkit {
    type Control = EguiControl;
    type Container = EguiContainer;

    fn create_window(&self, title: &str) -> Rc<EguiContainer> {
        let root = self.container(EguiContainerKind::Window(title.to_string()));
        *self.window.borrow_mut() = Some(Rc::clone(&root));
        root
    }

    fn create_tab(&self, name: &str) -> Rc<EguiContainer> {
        self.container(EguiContainerKind::Tab(name.to_string()))
    }

    fn create_group(&self, orientation: Orientation) -> Rc<EguiContainer> {
        self.container(EguiContainerKind::Group(orientation))
    }

    fn create_scroll_region(&self, options: ScrollOptions) -> Rc<EguiContainer> {
        self.container(EguiContainerKind::Scroll(options))
    }

    fn create_control(&self, spec: &ControlSpec) -> Rc<EguiControl> {
        Rc::new(EguiControl {
            id: self.next_id(),
            spec: spec.clone(),
            value: RefCell::new(None),
            callbacks: RefCell::new(Vec::new()),
        })
    }

    fn close_window(&self) {
        self.window.borrow_mut().take();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EguiContainerKind {
    Window(String),
    Tab(String),
    Group(Orientation),
    Scroll(ScrollOptions),
}

pub struct EguiContainer {
    id: usize,
    kind: EguiContainerKind,
    children: RefCell<Vec<LayoutItem<EguiToolkit>>>,
}

impl EguiContainer {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> &EguiContainerKind {
        &self.kind
    }

    /// Borrow the children for drawing
    pub fn children(&self) -> std::cell::Ref<'_, Vec<LayoutItem<EguiToolkit>>> {
        self.children.borrow()
    }
}

impl ToolkitContainer<EguiToolkit> for EguiContainer {
    fn add_child(&self, item: LayoutItem<EguiToolkit>) {
        self.children.borrow_mut().push(item);
    }
}

pub struct EguiControl {
    id: usize,
    spec: ControlSpec,
    /// `None` until a binding pushes the first value
    value: RefCell<Option<ControlValue>>,
    callbacks: RefCell<Vec<Rc<dyn Fn(ControlValue)>>>,
}

impl EguiControl {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn spec(&self) -> &ControlSpec {
        &self.spec
    }

    pub fn current(&self) -> Option<ControlValue> {
        self.value.borrow().clone()
    }

    /// Record a value the user produced this frame and notify the binding.
    /// No borrow is held while callbacks run, so they may push a value back.
    pub fn user_edit(&self, value: ControlValue) {
        *self.value.borrow_mut() = Some(value.clone());
        let callbacks = self.callbacks.borrow().clone();
        for callback in callbacks {
            callback(value.clone());
        }
    }
}

impl ToolkitControl for EguiControl {
    fn displayed_value(&self) -> ControlValue {
        self.current()
            .unwrap_or_else(|| self.spec.kind.initial_value())
    }

    fn set_displayed_value(&self, value: ControlValue) {
        *self.value.borrow_mut() = Some(value);
    }

    fn on_user_change(&self, callback: Box<dyn Fn(ControlValue)>) {
        self.callbacks.borrow_mut().push(Rc::from(callback));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::{ControlKind, NumberRange};

    #[test]
    fn test_unset_control_shows_value_of_its_kind() {
        let toolkit = EguiToolkit::new();
        let range = NumberRange {
            min: 2.0,
            ..NumberRange::default()
        };
        let number = toolkit.create_control(&ControlSpec::new(ControlKind::NumberInput(range)));
        let checkbox = toolkit.create_control(&ControlSpec::new(ControlKind::Checkbox));
        let color = toolkit.create_control(&ControlSpec::new(ControlKind::ColorInput));

        assert_eq!(number.current(), None);
        assert_eq!(number.displayed_value(), ControlValue::Number(2.0));
        assert_eq!(checkbox.displayed_value(), ControlValue::Bool(false));
        assert_eq!(color.displayed_value(), ControlValue::Color([0, 0, 0]));
    }

    #[test]
    fn test_user_edit_notifies_and_programmatic_set_does_not() {
        let toolkit = EguiToolkit::new();
        let control = toolkit.create_control(&ControlSpec::new(ControlKind::TextInput));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        control.on_user_change(Box::new(move |value| sink.borrow_mut().push(value)));

        control.set_displayed_value(ControlValue::Text("stored".into()));
        control.user_edit(ControlValue::Text("typed".into()));

        assert_eq!(*seen.borrow(), vec![ControlValue::Text("typed".into())]);
        assert_eq!(control.displayed_value(), ControlValue::Text("typed".into()));
    }
}
