use serde_json::{Map, Value};

/// Split a slash-separated field path, rejecting empty segments.
pub fn segments(path: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return None;
    }
    Some(parts)
}

/// Write `value` at `path` inside `document`, creating intermediate objects
/// as needed. A `null` value deletes the field instead; deleting something
/// that is not there does nothing. Returns `false` for a malformed path or a
/// document that is not an object.
pub fn apply_write(document: &mut Value, path: &str, value: Value) -> bool {
    let Some(parts) = segments(path) else {
        return false;
    };
    let Some((last, parents)) = parts.split_last() else {
        return false;
    };
    let Value::Object(root) = document else {
        return false;
    };

    if value.is_null() {
        let mut current = root;
        for part in parents {
            match current.get_mut(*part) {
                Some(Value::Object(next)) => current = next,
                _ => return true,
            }
        }
        current.remove(*last);
        return true;
    }

    let mut current = root;
    for part in parents {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return false;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
    true
}
