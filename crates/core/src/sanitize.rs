//! Defensive coercion of JSON columns that are expected to hold arrays.
//!
//! Older rows store `additional_options` and `issues` either as JSONB arrays
//! or as strings containing serialized arrays, and some are simply
//! malformed. Readers get an array in every case.

use serde_json::Value;

/// Coerce a stored JSON value into an array.
///
/// - an array is returned as-is
/// - a string is parsed; if it holds an array that array is returned
/// - anything else (null, object, malformed string) becomes `[]`
pub fn json_array(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
