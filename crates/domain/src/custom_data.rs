//! Custom-data normalization.
//!
//! Inventory items carry a free-form key/value map that has been
//! observed in several shapes: a JSON object, a string containing
//! serialized JSON, or absent entirely. Normalizing here keeps the
//! rest of the workflow working with one shape.

use serde_json::{Map, Value};

/// Extracts a custom-data map from whatever shape the source provides.
///
/// Unparseable strings and non-object values fall back to an empty
/// map rather than failing; custom data is decorative, never
/// load-bearing.
pub fn normalize(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}
