//! Core types for the status mirror.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Top-level keys of the scene manager's status, and the nested paths the
/// front end binds widgets to.
pub mod paths {
    pub const SCENE_MANAGER: &str = "scene-manager";
    pub const CHARACTERS: &str = "characters";
    pub const CHAT_HISTORY: &str = "chat-history";
    pub const ERRORS: &str = "errors";

    pub const LISTENING: &str = "scene-manager/listening";
    pub const AVAILABLE_TRANSITIONS: &str = "scene-manager/available-transitions";
    pub const DIAGRAM_URI: &str = "scene-manager/diagram-uri";
}

/// Structural equality of two status values.
///
/// Mapping key order is ignored, sequence order is not. Numbers compare by
/// value when either side is a float, so `1` and `1.0` are equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, l)| y.get(k).is_some_and(|r| values_equal(l, r)))
        }
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if x == y {
        return true;
    }
    if !(x.is_f64() || y.is_f64()) {
        return false;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

/// Whether `new` differs from what is currently stored.
///
/// An absent old value always counts as a change, including when the new
/// value is `null`.
pub fn has_changed(old: Option<&Value>, new: &Value) -> bool {
    match old {
        Some(old) => !values_equal(old, new),
        None => true,
    }
}

/// Short name of a value's kind, for diagnostics.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Outcome of publishing one value at one path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    /// Subscribers that received the value.
    pub delivered: usize,
    /// Callbacks that returned an error or panicked.
    pub failed: usize,
    /// Channel subscribers removed because they could not keep up.
    pub dropped: usize,
}

impl PublishReport {
    pub(crate) fn absorb(&mut self, other: PublishReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.dropped += other.dropped;
    }
}

/// Outcome of applying one update object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
    /// Paths whose value changed and were published.
    pub notified: usize,
    /// Paths written to the store.
    pub written: usize,
    /// Aggregated delivery results across all published paths.
    pub delivery: PublishReport,
}

impl UpdateSummary {
    /// True when the update changed nothing.
    pub fn is_noop(&self) -> bool {
        self.notified == 0 && self.written == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_key_order_ignored() {
        let a: Value = serde_json::from_str(r#"{"x": 1, "y": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y": 2, "x": 1}"#).unwrap();
        assert!(values_equal(&a, &b));
    }

    #[test]
    fn test_sequence_order_significant() {
        assert!(!values_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(values_equal(&json!(["a", "b"]), &json!(["a", "b"])));
    }

    #[test]
    fn test_integer_and_float_forms() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!(1.5)));
        assert!(!values_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn test_nested_difference_detected() {
        let old = json!({"a": {"b": [1, {"c": true}]}});
        let new = json!({"a": {"b": [1, {"c": false}]}});
        assert!(!values_equal(&old, &new));
    }

    #[test]
    fn test_absent_is_always_changed() {
        assert!(has_changed(None, &Value::Null));
        assert!(has_changed(Some(&Value::Null), &json!(0)));
        assert!(!has_changed(Some(&json!({"k": null})), &json!({"k": null})));
    }

    #[test]
    fn test_summary_noop() {
        assert!(UpdateSummary::default().is_noop());
        let summary = UpdateSummary {
            written: 1,
            ..Default::default()
        };
        assert!(!summary.is_noop());
    }
}
