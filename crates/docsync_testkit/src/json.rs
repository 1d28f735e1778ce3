//! Building documents from JSON literals.

use docsync_core::{Document, Value};

/// Converts a JSON value.
///
/// Numbers that do not fit an `i64` become their text form, since documents
/// hold no floats.
pub fn value_from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Text(n.to_string()),
        },
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Array(items) => {
            Value::Array(items.into_iter().map(value_from_json).collect())
        }
        serde_json::Value::Object(map) => Value::Document(
            map.into_iter()
                .map(|(k, v)| (k, value_from_json(v)))
                .collect(),
        ),
    }
}

/// Converts a JSON object into a document.
///
/// # Panics
///
/// Panics if `json` is not an object.
pub fn document_from_json(json: serde_json::Value) -> Document {
    match value_from_json(json) {
        Value::Document(doc) => doc,
        other => panic!("expected a JSON object, got {}", other.type_name()),
    }
}
