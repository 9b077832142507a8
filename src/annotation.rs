//! Raw metadata annotations as supplied by the class index.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Annotation names the scanner reacts to. Matching accepts the qualified form too
/// (`jakarta.validation.constraints.NotNull` is `NotNull`).
pub mod names {
    pub const SCHEMA: &str = "Schema";

    pub const JSONB_PROPERTY: &str = "JsonbProperty";
    pub const JSONB_TRANSIENT: &str = "JsonbTransient";
    pub const JSONB_PROPERTY_ORDER: &str = "JsonbPropertyOrder";

    pub const JSON_PROPERTY: &str = "JsonProperty";
    pub const JSON_IGNORE: &str = "JsonIgnore";
    pub const JSON_IGNORE_PROPERTIES: &str = "JsonIgnoreProperties";
    pub const JSON_IGNORE_TYPE: &str = "JsonIgnoreType";
    pub const JSON_PROPERTY_ORDER: &str = "JsonPropertyOrder";
    pub const JSON_NAMING: &str = "JsonNaming";

    pub const XML_ELEMENT: &str = "XmlElement";
    pub const XML_ATTRIBUTE: &str = "XmlAttribute";
    pub const XML_TYPE: &str = "XmlType";

    pub const DECIMAL_MAX: &str = "DecimalMax";
    pub const DECIMAL_MIN: &str = "DecimalMin";
    pub const DIGITS: &str = "Digits";
    pub const MAX: &str = "Max";
    pub const MIN: &str = "Min";
    pub const NEGATIVE: &str = "Negative";
    pub const NEGATIVE_OR_ZERO: &str = "NegativeOrZero";
    pub const NOT_BLANK: &str = "NotBlank";
    pub const NOT_EMPTY: &str = "NotEmpty";
    pub const NOT_NULL: &str = "NotNull";
    pub const PATTERN: &str = "Pattern";
    pub const POSITIVE: &str = "Positive";
    pub const POSITIVE_OR_ZERO: &str = "PositiveOrZero";
    pub const SIZE: &str = "Size";
}

/// JAXB's "use the default" marker for names.
const XML_DEFAULT: &str = "##default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(default)]
    pub values: IndexMap<String, Value>,
}

impl Annotation {
    pub fn new(name: &str) -> Self {
        Annotation { name: name.to_string(), values: IndexMap::new() }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
            || self.name.strip_suffix(name).is_some_and(|prefix| prefix.ends_with('.'))
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Non-empty string member. JAXB's `##default` counts as absent.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.value(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty() && *s != XML_DEFAULT)
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.value(key).and_then(Value::as_bool)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(Value::as_i64)
    }

    /// String-array member; a single string is accepted as a one-element array.
    pub fn strings(&self, key: &str) -> Vec<String> {
        match self.value(key) {
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            Some(Value::Array(xs)) => xs.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }
}

/// Anything carrying annotations: classes, fields, methods.
pub trait Annotated {
    fn annotations(&self) -> &[Annotation];

    fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations().iter().find(|a| a.is(name))
    }

    fn has_annotation(&self, name: &str) -> bool {
        self.annotation(name).is_some()
    }
}
