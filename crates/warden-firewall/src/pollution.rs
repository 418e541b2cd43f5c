//! Prototype-pollution body sanitizer.
//!
//! Runs before any other body-based logic so the scorer and business
//! handlers only ever see a freshly rebuilt tree with the reserved member
//! names removed.

use serde_json::{Map, Value};
use tracing::warn;

use crate::patterns::RESERVED_POLLUTION_KEYS;

/// Recursion cap when rebuilding nested bodies. Levels below the cap are
/// dropped entirely rather than passed through unsanitized.
pub const MAX_SANITIZE_DEPTH: usize = 32;

/// Result of sanitizing a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    /// The rebuilt body.
    pub value: Value,
    /// Reserved keys that were dropped, in encounter order.
    pub removed: Vec<String>,
}

impl Sanitized {
    /// Whether any reserved key was dropped.
    #[must_use]
    pub fn was_polluted(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Rebuild `body` into a fresh tree, dropping reserved pollution keys.
///
/// Keys are compared exactly (no normalization): the reserved names are
/// structural member names, and near-misses are legitimate data.
#[must_use]
pub fn sanitize(body: &Value) -> Sanitized {
    let mut removed = Vec::new();
    let value = rebuild(body, MAX_SANITIZE_DEPTH, &mut removed);
    if !removed.is_empty() {
        warn!(keys = ?removed, "dropped reserved pollution keys from body");
    }
    Sanitized { value, removed }
}

fn rebuild(value: &Value, depth: usize, removed: &mut Vec<String>) -> Value {
    if depth == 0 {
        return Value::Null;
    }
    match value {
        Value::Object(map) => {
            let mut fresh = Map::with_capacity(map.len());
            for (key, item) in map {
                if RESERVED_POLLUTION_KEYS.contains(&key.as_str()) {
                    removed.push(key.clone());
                    continue;
                }
                fresh.insert(key.clone(), rebuild(item, depth - 1, removed));
            }
            Value::Object(fresh)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| rebuild(item, depth - 1, removed))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("__proto__")]
    #[test_case("constructor")]
    #[test_case("prototype")]
    #[test_case("__defineGetter__")]
    #[test_case("__defineSetter__")]
    #[test_case("__lookupGetter__")]
    #[test_case("__lookupSetter__")]
    fn test_reserved_key_dropped(key: &str) {
        let body = json!({ key: { "polluted": true }, "name": "alice" });
        let result = sanitize(&body);
        assert!(result.was_polluted());
        assert_eq!(result.removed, vec![key.to_string()]);
        assert_eq!(result.value, json!({ "name": "alice" }));
    }

    #[test]
    fn test_nested_reserved_key_dropped() {
        let body = json!({
            "profile": { "settings": { "__proto__": { "isAdmin": true } } },
        });
        let result = sanitize(&body);
        assert!(result.was_polluted());
        assert_eq!(
            result.value,
            json!({ "profile": { "settings": {} } })
        );
    }

    #[test]
    fn test_reserved_key_inside_array_dropped() {
        let body = json!([{ "constructor": 1 }, { "ok": 2 }]);
        let result = sanitize(&body);
        assert_eq!(result.value, json!([{}, { "ok": 2 }]));
    }

    #[test]
    fn test_clean_body_unchanged() {
        let body = json!({
            "name": "alice",
            "tags": ["a", "b"],
            "count": 3,
            "active": true,
        });
        let result = sanitize(&body);
        assert!(!result.was_polluted());
        assert_eq!(result.value, body);
    }

    #[test]
    fn test_near_miss_keys_kept() {
        // Exact match only; these are legitimate field names
        let body = json!({ "proto": 1, "__proto": 2, "constructor_name": 3 });
        let result = sanitize(&body);
        assert!(!result.was_polluted());
        assert_eq!(result.value, body);
    }

    #[test]
    fn test_depth_overflow_truncates() {
        let mut body = json!("leaf");
        for _ in 0..(MAX_SANITIZE_DEPTH + 4) {
            body = json!({ "next": body });
        }
        let result = sanitize(&body);
        // The rebuilt tree bottoms out in null instead of carrying
        // unsanitized levels through
        let mut cursor = &result.value;
        let mut depth = 0;
        while let Some(next) = cursor.get("next") {
            cursor = next;
            depth += 1;
        }
        assert!(depth < MAX_SANITIZE_DEPTH + 4);
        assert!(cursor.is_null());
    }

    #[test]
    fn test_scalar_body_passthrough() {
        assert_eq!(sanitize(&json!(42)).value, json!(42));
        assert_eq!(sanitize(&json!("text")).value, json!("text"));
        assert_eq!(sanitize(&Value::Null).value, Value::Null);
    }
}
