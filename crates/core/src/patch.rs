//! JSON merge patch (RFC 7386) helpers.

use serde_json::{Map, Value};

/// Merge patch that turns `baseline` into `desired`. Returns `None` when the
/// two documents are equal.
pub fn merge_diff(baseline: &Value, desired: &Value) -> Option<Value> {
    if baseline == desired {
        return None;
    }

    match (baseline, desired) {
        (Value::Object(old), Value::Object(new)) => {
            let mut patch = Map::new();
            for (key, new_value) in new {
                match old.get(key) {
                    Some(old_value) => {
                        if let Some(nested) = merge_diff(old_value, new_value) {
                            patch.insert(key.clone(), nested);
                        }
                    }
                    None => {
                        patch.insert(key.clone(), new_value.clone());
                    }
                }
            }
            for key in old.keys() {
                if !new.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            Some(Value::Object(patch))
        }
        _ => Some(desired.clone()),
    }
}

/// Applies a merge patch in place, the way the API server does for
/// `application/merge-patch+json`.
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_fields) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(target_fields) = target {
        for (key, value) in patch_fields {
            if value.is_null() {
                target_fields.remove(key);
            } else {
                apply_merge_patch(target_fields.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
