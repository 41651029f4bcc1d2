//! Layout derived from the shape of a defaults document
//!
//! Top-level scalars go on a "General" tab, each top-level mapping gets a tab
//! of its own and deeper mappings become labelled groups. Arrays and nulls
//! have no control and are skipped.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{ContainerNode, LayoutRegistry};
use crate::color::HexColor;
use crate::config::Result;
use crate::constants::layout::{GENERAL_TAB, NUMBER_INPUT_MAX, NUMBER_INPUT_MIN};
use crate::toolkit::{LabelSpec, NumberRange, Orientation};

pub fn from_defaults(defaults: &Value) -> Result<LayoutRegistry> {
    let mut registry = LayoutRegistry::new();
    let Some(root) = defaults.as_object() else {
        return Ok(registry);
    };

    let scalars: Vec<_> = root.iter().filter(|(_, value)| !value.is_object()).collect();
    if !scalars.is_empty() {
        let general = registry.add_tab(GENERAL_TAB);
        for (key, value) in scalars {
            add_leaf(general, key, key, value)?;
        }
    }

    for (key, value) in root {
        if let Value::Object(section) = value
            && addressable(key)
        {
            let tab = registry.add_tab(&humanize(key));
            add_section(tab, key, section)?;
        }
    }

    debug!(tabs = ?registry.tab_names(), "Inferred layout from defaults");
    Ok(registry)
}

fn add_section(node: &mut ContainerNode, prefix: &str, section: &Map<String, Value>) -> Result<()> {
    for (key, value) in section {
        let full_key = format!("{prefix}.{key}");
        match value {
            Value::Object(nested) if addressable(key) => {
                let group = node.add_group(Orientation::Vertical);
                group.add_label(LabelSpec::new(humanize(key)).bold());
                add_section(group, &full_key, nested)?;
            }
            _ => add_leaf(node, key, &full_key, value)?,
        }
    }
    Ok(())
}

fn add_leaf(node: &mut ContainerNode, name: &str, key: &str, value: &Value) -> Result<()> {
    if !addressable(name) {
        return Ok(());
    }
    let description = humanize(name);
    match value {
        Value::Bool(_) => {
            node.checkbox(key, &description)?;
        }
        Value::String(text) if text.starts_with('#') && HexColor::is_valid(text) => {
            node.color_input(key, &description)?;
        }
        Value::String(_) => {
            node.text_input(key, &description)?;
        }
        Value::Number(number) => {
            let range = NumberRange {
                min: NUMBER_INPUT_MIN,
                max: NUMBER_INPUT_MAX,
                decimal: number.is_f64(),
                ..NumberRange::default()
            };
            node.number_input(key, range, &description)?;
        }
        Value::Array(_) | Value::Null | Value::Object(_) => {
            debug!(key = %key, "No control for value, skipping");
        }
    }
    Ok(())
}

fn addressable(name: &str) -> bool {
    let ok = !name.is_empty() && !name.contains('.');
    if !ok {
        warn!(key = %name, "Key cannot be addressed by a dotted path, skipping");
    }
    ok
}

/// `max_items` -> `Max items`
pub fn humanize(key: &str) -> String {
    let spaced = key.replace(['_', '-'], " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
