//! Conversions between stored config values and control values

use std::fmt;
use std::rc::Rc;

use serde_json::{Number, Value};

use crate::color::HexColor;
use crate::toolkit::{ControlKind, ControlValue, NumberRange};

type ToControlFn = dyn Fn(&Value) -> Option<ControlValue>;
type ToStoreFn = dyn Fn(&ControlValue) -> Option<Value>;

/// The pair of conversions a binding applies at the toolkit boundary.
/// Either direction returns `None` when the value does not fit.
#[derive(Clone)]
pub struct Coercion {
    expected: String,
    to_control: Rc<ToControlFn>,
    to_store: Rc<ToStoreFn>,
}

impl Coercion {
    pub fn new<C, S>(expected: impl Into<String>, to_control: C, to_store: S) -> Self
    where
        C: Fn(&Value) -> Option<ControlValue> + 'static,
        S: Fn(&ControlValue) -> Option<Value> + 'static,
    {
        Self {
            expected: expected.into(),
            to_control: Rc::new(to_control),
            to_store: Rc::new(to_store),
        }
    }

    /// Conversions and type assertions implied by a control kind
    pub fn for_kind(kind: &ControlKind) -> Self {
        let control_kind = kind.clone();
        let store_kind = kind.clone();
        Self::new(
            kind.expected(),
            move |value| control_kind.to_control(value),
            move |value| store_kind.to_store(value),
        )
    }

    /// Description of the stored value this coercion accepts
    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn to_control(&self, value: &Value) -> Option<ControlValue> {
        (self.to_control)(value)
    }

    pub fn to_store(&self, value: &ControlValue) -> Option<Value> {
        (self.to_store)(value)
    }
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coercion")
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

/// Extra predicate on the stored value, checked after coercion
#[derive(Clone)]
pub struct Validator {
    expected: String,
    predicate: Rc<dyn Fn(&Value) -> bool>,
}

impl Validator {
    pub fn new(expected: impl Into<String>, predicate: impl Fn(&Value) -> bool + 'static) -> Self {
        Self {
            expected: expected.into(),
            predicate: Rc::new(predicate),
        }
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn accepts(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }

    /// Both predicates must accept
    pub fn and(self, other: Validator) -> Validator {
        let expected = format!("{} and {}", self.expected, other.expected);
        Validator::new(expected, move |value| self.accepts(value) && other.accepts(value))
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

impl ControlKind {
    pub fn expected(&self) -> String {
        match self {
            ControlKind::Checkbox => "a boolean".to_string(),
            ControlKind::Dropdown { values, .. } => {
                let choices: Vec<String> = values.iter().map(Value::to_string).collect();
                format!("one of [{}]", choices.join(", "))
            }
            ControlKind::TextInput | ControlKind::PathInput { .. } => "a string".to_string(),
            ControlKind::NumberInput(range) => {
                let shape = if range.decimal { "a number" } else { "an integer" };
                format!("{shape} between {} and {}", range.min, range.max)
            }
            ControlKind::ColorInput => "a hex color string like #rrggbb or #rgb".to_string(),
        }
    }

    /// Whether a stored value has the shape this kind of control edits
    pub fn check_stored(&self, value: &Value) -> bool {
        self.to_control(value).is_some()
    }

    pub fn to_control(&self, value: &Value) -> Option<ControlValue> {
        match self {
            ControlKind::Checkbox => value.as_bool().map(ControlValue::Bool),
            ControlKind::Dropdown { values, .. } => values
                .iter()
                .position(|choice| choice == value)
                .map(|index| ControlValue::Choice(Some(index))),
            ControlKind::TextInput | ControlKind::PathInput { .. } => {
                value.as_str().map(|text| ControlValue::Text(text.to_string()))
            }
            ControlKind::NumberInput(range) => {
                let number = value.as_f64()?;
                if !range.decimal && !is_integral(value) {
                    return None;
                }
                range.contains(number).then_some(ControlValue::Number(number))
            }
            ControlKind::ColorInput => value
                .as_str()
                .and_then(HexColor::parse)
                .map(|color| ControlValue::Color(color.rgb())),
        }
    }

    pub fn to_store(&self, value: &ControlValue) -> Option<Value> {
        match (self, value) {
            (ControlKind::Checkbox, ControlValue::Bool(checked)) => Some(Value::Bool(*checked)),
            (ControlKind::Dropdown { values, .. }, ControlValue::Choice(Some(index))) => {
                values.get(*index).cloned()
            }
            (
                ControlKind::TextInput | ControlKind::PathInput { .. },
                ControlValue::Text(text),
            ) => Some(Value::String(text.clone())),
            (ControlKind::NumberInput(range), ControlValue::Number(number)) => {
                number_to_store(range, *number)
            }
            (ControlKind::ColorInput, ControlValue::Color(rgb)) => {
                Some(Value::String(HexColor::from(*rgb).to_hex_string()))
            }
            _ => None,
        }
    }
}

impl NumberRange {
    pub fn contains(&self, number: f64) -> bool {
        number.is_finite() && number >= self.min && number <= self.max
    }
}

fn is_integral(value: &Value) -> bool {
    match value {
        Value::Number(number) if number.is_i64() || number.is_u64() => true,
        Value::Number(number) => number.as_f64().is_some_and(|n| n.fract() == 0.0),
        _ => false,
    }
}

fn number_to_store(range: &NumberRange, number: f64) -> Option<Value> {
    if !range.contains(number) {
        return None;
    }
    if range.decimal {
        return Number::from_f64(number).map(Value::Number);
    }
    // Bounds were checked above, so the cast cannot saturate past them
    (number.fract() == 0.0).then(|| Value::from(number as i64))
}
