// src/transform/path.rs
//
// Dot-path resolution into JSON values. Segments address object keys;
// numeric segments index into arrays.

use serde_json::Value;

pub fn json_get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(list) => list.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolves the path and renders scalars as text. Strings are trimmed and
/// must be non-empty; numbers and booleans are formatted; containers and
/// null resolve to `None`.
pub fn json_text(value: &Value, path: &str) -> Option<String> {
    match json_get(value, path)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
