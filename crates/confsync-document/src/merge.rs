//! Deep merge of configuration documents
//!
//! Rules, applied per key of the patch:
//! - a nested object in the patch is merged recursively into the base value
//!   (a missing or non-object base value counts as an empty object)
//! - anything else (scalar, null, array) replaces the base value outright
//!
//! Keys that only exist in the base are kept. Arrays are never merged
//! element-wise; callers replace one entry of a list by sending the whole
//! rebuilt list. Null is an ordinary value here, not a deletion marker.

use serde_json::{Map, Value as JsonValue};

use crate::document::Document;

/// Merge `patch` over `base`, returning a new document
///
/// Neither input is modified.
#[inline]
#[must_use]
pub fn merge(base: &Document, patch: &Document) -> Document {
    let mut merged = base.clone();
    merge_into(&mut merged, patch);
    merged
}

/// Merge `patch` into `base` in place
///
/// Used for the live mirror, where the pre-merge value is not needed.
#[inline]
pub fn merge_into(base: &mut Document, patch: &Document) {
    merge_maps(base.as_map_mut(), patch.as_map());
}

/// Merge two arbitrary JSON values under the same rules
///
/// Only object-over-object merges recurse; every other patch value wins.
#[must_use]
pub fn merge_values(base: &JsonValue, patch: &JsonValue) -> JsonValue {
    match patch {
        JsonValue::Object(patch_map) => {
            let mut result = match base {
                JsonValue::Object(base_map) => base_map.clone(),
                _ => Map::new(),
            };
            merge_maps(&mut result, patch_map);
            JsonValue::Object(result)
        }
        other => other.clone(),
    }
}

fn merge_maps(base: &mut Map<String, JsonValue>, patch: &Map<String, JsonValue>) {
    for (key, patch_val) in patch {
        match patch_val {
            JsonValue::Object(patch_map) => {
                let slot = base
                    .entry(key.clone())
                    .or_insert_with(|| JsonValue::Object(Map::new()));
                if !slot.is_object() {
                    *slot = JsonValue::Object(Map::new());
                }
                if let JsonValue::Object(base_map) = slot {
                    merge_maps(base_map, patch_map);
                }
            }
            other => {
                base.insert(key.clone(), other.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: JsonValue) -> Document {
        Document::try_from(value).unwrap()
    }

    #[test]
    fn merge_overwrites_scalars_and_keeps_base_only_keys() {
        let base = doc(json!({"x": 1, "y": 2}));
        let patch = doc(json!({"y": 3, "z": 4}));
        assert_eq!(merge(&base, &patch), doc(json!({"x": 1, "y": 3, "z": 4})));
    }

    #[test]
    fn merge_replaces_arrays_wholesale() {
        let base = doc(json!({"items": [1, 2, 3]}));
        let patch = doc(json!({"items": [9]}));
        assert_eq!(merge(&base, &patch).get("/items"), Some(&json!([9])));
    }

    #[test]
    fn merge_recurses_into_nested_objects() {
        let base = doc(json!({
            "api": {
                "ProviderA": {"model": "a-1", "api_key": "ka"},
                "ProviderB": {"model": "b-1", "api_key": "kb"}
            }
        }));
        let patch = doc(json!({"api": {"ProviderA": {"model": "a-2"}}}));
        let merged = merge(&base, &patch);
        assert_eq!(merged.get("/api/ProviderA/model"), Some(&json!("a-2")));
        assert_eq!(merged.get("/api/ProviderA/api_key"), Some(&json!("ka")));
        assert_eq!(merged.get("/api/ProviderB/model"), Some(&json!("b-1")));
    }

    #[test]
    fn merge_treats_scalar_base_as_empty_object() {
        let base = doc(json!({"proxy": "off"}));
        let patch = doc(json!({"proxy": {"host": "127.0.0.1"}}));
        assert_eq!(
            merge(&base, &patch),
            doc(json!({"proxy": {"host": "127.0.0.1"}}))
        );
    }

    #[test]
    fn merge_null_replaces_instead_of_deleting() {
        let base = doc(json!({"token": "abc", "keep": true}));
        let patch = doc(json!({"token": null}));
        assert_eq!(
            merge(&base, &patch),
            doc(json!({"token": null, "keep": true}))
        );
    }

    #[test]
    fn merge_object_replaced_by_array() {
        let base = doc(json!({"platforms": {"a": 1}}));
        let patch = doc(json!({"platforms": ["a"]}));
        assert_eq!(merge(&base, &patch), doc(json!({"platforms": ["a"]})));
    }

    #[test]
    fn merge_leaves_inputs_untouched() {
        let base = doc(json!({"a": {"b": 1}}));
        let patch = doc(json!({"a": {"c": 2}}));
        let base_before = base.clone();
        let patch_before = patch.clone();
        let _ = merge(&base, &patch);
        assert_eq!(base, base_before);
        assert_eq!(patch, patch_before);
    }

    #[test]
    fn merge_into_matches_pure_merge() {
        let base = doc(json!({"a": {"b": 1}, "l": [1]}));
        let patch = doc(json!({"a": {"c": 2}, "l": []}));
        let mut live = base.clone();
        merge_into(&mut live, &patch);
        assert_eq!(live, merge(&base, &patch));
    }

    #[test]
    fn merge_values_non_object_patch_wins() {
        assert_eq!(merge_values(&json!({"a": 1}), &json!(5)), json!(5));
        assert_eq!(
            merge_values(&json!(5), &json!({"a": 1})),
            json!({"a": 1})
        );
    }
}
