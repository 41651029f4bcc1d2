//! Draws the retained widget tree with egui

use eframe::egui;
use tracing::debug;

use super::constants::*;
use super::toolkit::{EguiContainer, EguiContainerKind, EguiControl, EguiToolkit};
use crate::constants::layout::LABEL_SPACING;
use crate::toolkit::{ControlKind, ControlValue, LabelSpec, LayoutItem, Orientation};

/// Tab bar, the selected tab's contents, then anything the root holds besides
/// tabs (the footer)
pub fn window_body(ui: &mut egui::Ui, root: &EguiContainer, selected_tab: &mut usize) {
    let children = root.children();
    let tabs: Vec<&EguiContainer> = children
        .iter()
        .filter_map(|item| match item {
            LayoutItem::Container(container)
                if matches!(container.kind(), EguiContainerKind::Tab(_)) =>
            {
                Some(container.as_ref())
            }
            _ => None,
        })
        .collect();

    if tabs.is_empty() {
        ui.label("Nothing to configure.");
    } else {
        *selected_tab = (*selected_tab).min(tabs.len() - 1);
        ui.horizontal(|ui| {
            for (index, tab) in tabs.iter().enumerate() {
                if let EguiContainerKind::Tab(name) = tab.kind() {
                    ui.selectable_value(selected_tab, index, name.as_str());
                }
            }
        });
        ui.separator();
        ui.add_space(ITEM_SPACING);

        let tab = tabs[*selected_tab];
        egui::ScrollArea::vertical()
            .id_salt(("tab", tab.id()))
            .max_height((ui.available_height() - FOOTER_RESERVED_HEIGHT).max(0.0))
            .show(ui, |ui| items(ui, &tab.children()));
    }

    let footer: Vec<&LayoutItem<EguiToolkit>> = children
        .iter()
        .filter(|item| !matches!(item, LayoutItem::Container(c) if matches!(c.kind(), EguiContainerKind::Tab(_))))
        .collect();
    if !footer.is_empty() {
        ui.add_space(SECTION_SPACING);
        for item in footer {
            self::item(ui, item);
        }
    }
}

fn items(ui: &mut egui::Ui, children: &[LayoutItem<EguiToolkit>]) {
    for child in children {
        item(ui, child);
    }
}

fn item(ui: &mut egui::Ui, item: &LayoutItem<EguiToolkit>) {
    match item {
        LayoutItem::Container(container) => self::container(ui, container),
        LayoutItem::Control(control) => self::control(ui, control),
        LayoutItem::Label(spec) => label(ui, spec),
        LayoutItem::Space(amount) => ui.add_space(*amount),
        // egui packs widgets greedily; trailing space is simply left empty
        LayoutItem::Stretch(_) => {}
    }
}

fn container(ui: &mut egui::Ui, container: &EguiContainer) {
    let children = container.children();
    match container.kind() {
        EguiContainerKind::Group(Orientation::Horizontal) => {
            ui.horizontal(|ui| items(ui, &children));
        }
        EguiContainerKind::Group(Orientation::Vertical) => {
            ui.vertical(|ui| items(ui, &children));
        }
        EguiContainerKind::Scroll(options) => {
            egui::ScrollArea::new([options.horizontal, options.vertical])
                .id_salt(("scroll", container.id()))
                .show(ui, |ui| items(ui, &children));
        }
        EguiContainerKind::Window(_) | EguiContainerKind::Tab(_) => items(ui, &children),
    }
}

fn label(ui: &mut egui::Ui, spec: &LabelSpec) {
    let mut text = egui::RichText::new(&spec.text);
    if spec.bold {
        text = text.strong();
    }
    if let Some(size) = spec.size {
        text = text.size(size);
    }
    let mut widget = egui::Label::new(text);
    if spec.multiline {
        widget = widget.wrap();
    }
    let response = ui.add(widget);
    if let Some(tooltip) = &spec.tooltip {
        response.on_hover_text(tooltip);
    }
}

fn control(ui: &mut egui::Ui, control: &EguiControl) {
    let Some(before) = control.current() else {
        return;
    };
    let spec = control.spec();
    let mut value = before.clone();

    let response = ui.horizontal(|ui| {
        // Checkboxes carry their description as the widget text
        if let Some(description) = &spec.description
            && !matches!(spec.kind, ControlKind::Checkbox)
        {
            ui.label(description);
            ui.add_space(LABEL_SPACING);
        }
        widget(ui, control, &mut value);
    });
    if let Some(tooltip) = &spec.tooltip {
        response.response.on_hover_text(tooltip);
    }

    if value != before {
        debug!(control = control.id(), kind = spec.kind.name(), "User edited control");
        control.user_edit(value);
    }
}

fn widget(ui: &mut egui::Ui, control: &EguiControl, value: &mut ControlValue) {
    let spec = control.spec();
    match (&spec.kind, value) {
        (ControlKind::Checkbox, ControlValue::Bool(checked)) => {
            ui.checkbox(checked, spec.description.as_deref().unwrap_or_default());
        }
        (ControlKind::Dropdown { labels, .. }, ControlValue::Choice(choice)) => {
            let selected = choice
                .and_then(|index| labels.get(index))
                .cloned()
                .unwrap_or_default();
            egui::ComboBox::from_id_salt(("dropdown", control.id()))
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    for (index, label) in labels.iter().enumerate() {
                        ui.selectable_value(&mut *choice, Some(index), label.as_str());
                    }
                });
        }
        (ControlKind::TextInput, ControlValue::Text(text)) => {
            ui.text_edit_singleline(text);
        }
        (ControlKind::NumberInput(range), ControlValue::Number(number)) => {
            let decimals = if range.decimal { range.precision } else { 0 };
            ui.add(
                egui::DragValue::new(number)
                    .range(range.min..=range.max)
                    .speed(range.step)
                    .fixed_decimals(decimals),
            );
        }
        (ControlKind::ColorInput, ControlValue::Color(rgb)) => {
            ui.color_edit_button_srgb(rgb);
        }
        (ControlKind::PathInput { directory, filter }, ControlValue::Text(text)) => {
            ui.add(egui::TextEdit::singleline(text).desired_width(PATH_INPUT_WIDTH));
            if ui.button("Browse…").clicked()
                && let Some(path) = pick_path(*directory, filter)
            {
                *text = path.display().to_string();
            }
        }
        (kind, value) => {
            ui.colored_label(
                STATUS_ERROR,
                format!("{} cannot show {value:?}", kind.name()),
            );
        }
    }
}

fn pick_path(directory: bool, filter: &str) -> Option<std::path::PathBuf> {
    let mut dialog = rfd::FileDialog::new();
    if directory {
        return dialog.pick_folder();
    }
    for (name, extensions) in parse_filters(filter) {
        dialog = dialog.add_filter(name, extensions.as_slice());
    }
    dialog.pick_file()
}

/// `Images (*.png *.jpg);;Text (*.txt)` -> `[("Images", ["png", "jpg"]), ("Text", ["txt"])]`.
/// Wildcard-only entries such as `All files (*)` are dropped.
fn parse_filters(filter: &str) -> Vec<(String, Vec<String>)> {
    filter
        .split(";;")
        .filter_map(|entry| {
            let (name, rest) = entry.split_once('(')?;
            let patterns = rest.split_once(')')?.0;
            let extensions: Vec<String> = patterns
                .split_whitespace()
                .filter_map(|pattern| pattern.strip_prefix("*."))
                .map(str::to_string)
                .collect();
            (!extensions.is_empty()).then(|| (name.trim().to_string(), extensions))
        })
        .collect()
}
