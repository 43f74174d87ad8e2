//! Input abstraction: converting raw authored values into typed values.
//!
//! An [`Input`] holds the raw value authored into a rule (a string from a
//! form, a number, a list for `in` operators) and exposes the typed
//! [`Value`] the comparator or action actually consumes. It also describes
//! the UI shape needed to collect the value. Only the descriptor lives
//! here; rendering belongs to the host.

use chrono::NaiveDate;
use serde_json::json;

use super::value::Value;

/// A named converter from raw authored values to typed [`Value`]s, plus a
/// form descriptor for the host's authoring UI.
pub trait Input {
    /// The name the input was registered under.
    fn name(&self) -> &str;

    /// Assign the registered name. Called once by the registry.
    fn set_name(&mut self, name: String);

    /// Store a raw authored value.
    fn set_raw(&mut self, raw: Value);

    /// The raw authored value, if one was set.
    fn raw(&self) -> Option<&Value>;

    /// The typed value this input represents, if the raw value was set and
    /// convertible. List raws convert element-wise so `in` operators see a
    /// typed set.
    fn value(&self) -> Option<Value>;

    /// The form control kind for authoring UIs.
    fn form_type(&self) -> &'static str;

    /// Free-form options for the form control.
    fn form_options(&self) -> serde_json::Value {
        json!({})
    }
}

/// Shared plumbing for the standard inputs: name + raw slot + element-wise
/// list conversion around a scalar `convert` function.
macro_rules! standard_input {
    ($(#[$doc:meta])* $name:ident, $form_type:literal) => {
        $(#[$doc])*
        #[derive(Debug, Default)]
        pub struct $name {
            name: String,
            raw: Option<Value>,
        }

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }
        }

        impl Input for $name {
            fn name(&self) -> &str {
                &self.name
            }

            fn set_name(&mut self, name: String) {
                self.name = name;
            }

            fn set_raw(&mut self, raw: Value) {
                self.raw = Some(raw);
            }

            fn raw(&self) -> Option<&Value> {
                self.raw.as_ref()
            }

            fn value(&self) -> Option<Value> {
                match self.raw.as_ref()? {
                    Value::List(items) => {
                        let converted: Option<Vec<Value>> =
                            items.iter().map(Self::convert).collect();
                        converted.map(Value::List)
                    }
                    raw => Self::convert(raw),
                }
            }

            fn form_type(&self) -> &'static str {
                $form_type
            }

            fn form_options(&self) -> serde_json::Value {
                Self::options()
            }
        }
    };
}

standard_input!(
    /// Converts raw values to [`Value::Int`]. Floats truncate, text parses.
    IntegerInput,
    "integer"
);

impl IntegerInput {
    fn convert(raw: &Value) -> Option<Value> {
        match raw {
            Value::Int(v) => Some(Value::Int(*v)),
            #[allow(clippy::cast_possible_truncation)]
            Value::Float(v) => Some(Value::Int(*v as i64)),
            Value::Text(v) => v.trim().parse::<i64>().ok().map(Value::Int),
            _ => None,
        }
    }

    fn options() -> serde_json::Value {
        json!({})
    }
}

standard_input!(
    /// Converts raw values to [`Value::Float`].
    FloatInput,
    "number"
);

impl FloatInput {
    fn convert(raw: &Value) -> Option<Value> {
        match raw {
            #[allow(clippy::cast_precision_loss)]
            Value::Int(v) => Some(Value::Float(*v as f64)),
            Value::Float(v) => Some(Value::Float(*v)),
            Value::Text(v) => v.trim().parse::<f64>().ok().map(Value::Float),
            _ => None,
        }
    }

    fn options() -> serde_json::Value {
        json!({ "step": "any" })
    }
}

standard_input!(
    /// Converts raw values to [`Value::Bool`]. Accepts the text forms
    /// `true`/`false`/`yes`/`no`/`1`/`0`.
    BooleanInput,
    "checkbox"
);

impl BooleanInput {
    fn convert(raw: &Value) -> Option<Value> {
        match raw {
            Value::Bool(v) => Some(Value::Bool(*v)),
            Value::Int(0) => Some(Value::Bool(false)),
            Value::Int(1) => Some(Value::Bool(true)),
            Value::Text(v) => match v.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }

    fn options() -> serde_json::Value {
        json!({})
    }
}

standard_input!(
    /// Passes text through; numbers and booleans are rendered to text.
    TextInput,
    "text"
);

impl TextInput {
    fn convert(raw: &Value) -> Option<Value> {
        match raw {
            Value::Text(v) => Some(Value::Text(v.clone())),
            Value::Int(v) => Some(Value::Text(v.to_string())),
            Value::Float(v) => Some(Value::Text(v.to_string())),
            Value::Bool(v) => Some(Value::Text(v.to_string())),
            _ => None,
        }
    }

    fn options() -> serde_json::Value {
        json!({})
    }
}

standard_input!(
    /// Converts `YYYY-MM-DD` text (or a date value) to [`Value::Date`].
    DateInput,
    "date"
);

impl DateInput {
    fn convert(raw: &Value) -> Option<Value> {
        match raw {
            Value::Date(v) => Some(Value::Date(*v)),
            Value::Text(v) => NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                .ok()
                .map(Value::Date),
            _ => None,
        }
    }

    fn options() -> serde_json::Value {
        json!({ "format": "yyyy-MM-dd" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_input_conversions() {
        let mut input = IntegerInput::new();
        assert_eq!(input.value(), None);

        input.set_raw(Value::Text(" 42 ".into()));
        assert_eq!(input.value(), Some(Value::Int(42)));
        assert_eq!(input.raw(), Some(&Value::Text(" 42 ".into())));

        input.set_raw(Value::Float(3.9));
        assert_eq!(input.value(), Some(Value::Int(3)));

        input.set_raw(Value::Text("not a number".into()));
        assert_eq!(input.value(), None);
    }

    #[test]
    fn integer_input_converts_lists_element_wise() {
        let mut input = IntegerInput::new();
        input.set_raw(Value::from(vec!["1", "5", "9"]));
        assert_eq!(input.value(), Some(Value::from(vec![1_i64, 5, 9])));
    }

    #[test]
    fn list_with_unconvertible_element_yields_none() {
        let mut input = IntegerInput::new();
        input.set_raw(Value::from(vec!["1", "x"]));
        assert_eq!(input.value(), None);
    }

    #[test]
    fn float_input_conversions() {
        let mut input = FloatInput::new();
        input.set_raw(Value::Int(2));
        assert_eq!(input.value(), Some(Value::Float(2.0)));
        input.set_raw(Value::Text("2.5".into()));
        assert_eq!(input.value(), Some(Value::Float(2.5)));
    }

    #[test]
    fn boolean_input_text_forms() {
        let mut input = BooleanInput::new();
        for (raw, expected) in [("true", true), ("Yes", true), ("0", false), ("no", false)] {
            input.set_raw(Value::Text(raw.into()));
            assert_eq!(input.value(), Some(Value::Bool(expected)), "raw {raw}");
        }
        input.set_raw(Value::Text("maybe".into()));
        assert_eq!(input.value(), None);
    }

    #[test]
    fn text_input_renders_numbers() {
        let mut input = TextInput::new();
        input.set_raw(Value::Int(7));
        assert_eq!(input.value(), Some(Value::Text("7".into())));
    }

    #[test]
    fn date_input_parses_iso_dates() {
        let mut input = DateInput::new();
        input.set_raw(Value::Text("2024-01-15".into()));
        assert_eq!(
            input.value(),
            Some(Value::Date(
                chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
            ))
        );

        input.set_raw(Value::Text("01/15/2024".into()));
        assert_eq!(input.value(), None);
    }

    #[test]
    fn form_descriptors() {
        assert_eq!(IntegerInput::new().form_type(), "integer");
        assert_eq!(DateInput::new().form_type(), "date");
        assert_eq!(
            DateInput::new().form_options(),
            json!({ "format": "yyyy-MM-dd" })
        );
    }

    #[test]
    fn name_assignment() {
        let mut input = TextInput::new();
        input.set_name("Free Text".into());
        assert_eq!(input.name(), "Free Text");
    }
}
