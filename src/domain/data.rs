//! Raw configuration data and nested key-path helpers.
//!
//! Keys are addressed with dotted paths (`"page.front"`). A key holding
//! `null` is present; a missing key is absent. The two are never conflated.

use serde_json::{Map, Value};

/// Ordered mapping persisted verbatim by storage backends.
pub type RawData = Map<String, Value>;

/// Look up a dotted key path.
pub fn get_path<'a>(data: &'a RawData, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let first = parts.next()?;
    let mut current = data.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Set a dotted key path, creating intermediate mappings as needed.
///
/// An intermediate value that is not a mapping is replaced by one.
pub fn set_path(data: &mut RawData, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            data.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = data.entry(head.to_string()).or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(child) = slot {
                set_path(child, rest, value);
            }
        }
    }
}

/// Remove the leaf of a dotted key path. Returns the removed value.
pub fn clear_path(data: &mut RawData, key: &str) -> Option<Value> {
    match key.split_once('.') {
        None => data.remove(key),
        Some((head, rest)) => match data.get_mut(head) {
            Some(Value::Object(child)) => clear_path(child, rest),
            _ => None,
        },
    }
}

/// Superimpose `overlay` on `base`.
///
/// Keys that are mappings on both sides are merged recursively; any other
/// overlay value, explicit `null` included, replaces the base value.
pub fn merge_deep(base: &RawData, overlay: &RawData) -> RawData {
    let mut merged = base.clone();
    merge_into(&mut merged, overlay);
    merged
}

fn merge_into(target: &mut RawData, overlay: &RawData) {
    for (key, value) in overlay {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> RawData {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn get_path_distinguishes_null_from_absent() {
        let d = data(json!({"foo": "bar", "baz": null}));
        assert_eq!(get_path(&d, "foo"), Some(&json!("bar")));
        assert_eq!(get_path(&d, "baz"), Some(&Value::Null));
        assert_eq!(get_path(&d, "missing"), None);
    }

    #[test]
    fn get_path_walks_nested_mappings() {
        let d = data(json!({"page": {"front": "/node", "403": ""}}));
        assert_eq!(get_path(&d, "page.front"), Some(&json!("/node")));
        assert_eq!(get_path(&d, "page.front.deeper"), None);
        assert_eq!(get_path(&d, "page"), Some(&json!({"front": "/node", "403": ""})));
    }

    #[test]
    fn set_path_creates_and_replaces_intermediates() {
        let mut d = data(json!({"a": 1}));
        set_path(&mut d, "b.c", json!(true));
        set_path(&mut d, "a.x", json!("y"));
        assert_eq!(Value::Object(d), json!({"a": {"x": "y"}, "b": {"c": true}}));
    }

    #[test]
    fn clear_path_removes_leaf_only() {
        let mut d = data(json!({"a": {"b": 1, "c": 2}}));
        assert_eq!(clear_path(&mut d, "a.b"), Some(json!(1)));
        assert_eq!(clear_path(&mut d, "a.zzz"), None);
        assert_eq!(Value::Object(d), json!({"a": {"c": 2}}));
    }

    #[test]
    fn merge_deep_overlays_at_leaf_level() {
        let base = data(json!({"foo": "bar", "baz": null, "nested": {"keep": 1, "swap": 2}}));
        let overlay = data(json!({"baz": "injected", "nested": {"swap": 3}, "extra": [1, 2]}));
        let merged = merge_deep(&base, &overlay);
        assert_eq!(
            Value::Object(merged),
            json!({
                "foo": "bar",
                "baz": "injected",
                "nested": {"keep": 1, "swap": 3},
                "extra": [1, 2]
            })
        );
    }

    #[test]
    fn merge_deep_null_overlay_suppresses_base() {
        let base = data(json!({"foo": "bar"}));
        let overlay = data(json!({"foo": null}));
        assert_eq!(get_path(&merge_deep(&base, &overlay), "foo"), Some(&Value::Null));
    }
}
