//! Typed accessors over the raw field bag.
//!
//! Every domain decode goes through these helpers so defaulting happens in
//! exactly one place: missing or malformed numbers become `0.0`, missing
//! strings become `""`. Downstream aggregates (completion rates, averages)
//! rely on those defaults.

use serde_json::{Map, Value};

pub struct FieldBag<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> FieldBag<'a> {
    pub fn new(fields: &'a Map<String, Value>) -> Self {
        Self { fields }
    }

    /// String field, defaulting to the empty string.
    pub fn text(&self, key: &str) -> String {
        self.opt_text(key).unwrap_or_default()
    }

    /// String field, `None` when missing or blank.
    pub fn opt_text(&self, key: &str) -> Option<String> {
        match self.fields.get(key) {
            Some(Value::String(value)) if !value.trim().is_empty() => {
                Some(value.trim().to_string())
            }
            _ => None,
        }
    }

    /// Numeric field, defaulting to zero. Numeric strings are tolerated
    /// since formula columns sometimes render as text.
    pub fn number(&self, key: &str) -> f64 {
        self.opt_number(key).unwrap_or(0.0)
    }

    /// Numeric field, `None` when missing or malformed.
    pub fn opt_number(&self, key: &str) -> Option<f64> {
        match self.fields.get(key) {
            Some(Value::Number(value)) => value.as_f64(),
            Some(Value::String(value)) => value.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Comma-joined list field, split and trimmed, empties dropped.
    pub fn name_list(&self, key: &str) -> Vec<String> {
        self.text(key)
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }
}
