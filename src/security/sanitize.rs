use log::warn;
use serde_json::Value;

/// Drops object keys that MongoDB would read as operators (`$gt`) or paths
/// (`a.b`), at any depth. Returns how many keys were removed.
pub fn strip_operator_keys(value: &mut Value) -> usize {
    match value {
        Value::Object(map) => {
            let before = map.len();
            map.retain(|key, _| !key.starts_with('$') && !key.contains('.'));
            let mut removed = before - map.len();
            for child in map.values_mut() {
                removed += strip_operator_keys(child);
            }
            removed
        }
        Value::Array(items) => items.iter_mut().map(strip_operator_keys).sum(),
        _ => 0,
    }
}

/// Sanitizes a payload and logs when something was stripped.
pub fn sanitize(mut value: Value) -> Value {
    let removed = strip_operator_keys(&mut value);
    if removed > 0 {
        warn!("Stripped {} operator-like key(s) from request payload", removed);
    }
    value
}
