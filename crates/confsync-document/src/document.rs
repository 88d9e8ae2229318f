//! Configuration document
//!
//! A [`Document`] is a JSON object at the root: a tree of named fields whose
//! values are scalars, arrays or nested objects. Keeping the root an object
//! at the type level means a structurally invalid document can never be
//! installed as a mirror.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::hash::ContentHash;
use crate::merge;

/// Configuration document (root is always an object)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, JsonValue>);

impl Document {
    /// Create an empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON map
    #[inline]
    #[must_use]
    pub fn from_map(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }

    /// Parse from JSON string
    ///
    /// # Errors
    /// Returns error if the text is not JSON or its root is not an object
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::try_from(value)
    }

    /// Build a sparse patch that sets a single field addressed by a JSON pointer
    ///
    /// `"/api/ProviderA/model"` with `"gpt"` yields
    /// `{"api": {"ProviderA": {"model": "gpt"}}}`. The empty pointer means the
    /// whole document, so `value` must itself be an object.
    ///
    /// # Examples
    /// ```
    /// # use confsync_document::Document;
    /// # use serde_json::json;
    /// let patch = Document::patch_at("/api/ProviderA/model", json!("gpt")).unwrap();
    /// assert_eq!(patch.get("/api/ProviderA/model"), Some(&json!("gpt")));
    /// ```
    ///
    /// # Errors
    /// Returns error for a pointer without a leading `/`, or a non-object
    /// value at the root pointer
    pub fn patch_at(pointer: &str, value: JsonValue) -> Result<Self, DocumentError> {
        if pointer.is_empty() {
            return Self::try_from(value);
        }
        let rest = pointer
            .strip_prefix('/')
            .ok_or_else(|| DocumentError::InvalidPointer(pointer.to_string()))?;

        let tokens: Vec<String> = rest.split('/').map(unescape_token).collect();
        let mut nested = value;
        for token in tokens.iter().rev() {
            let mut map = Map::new();
            map.insert(token.clone(), nested);
            nested = JsonValue::Object(map);
        }
        Self::try_from(nested)
    }

    /// Get a value by JSON pointer
    ///
    /// # Examples
    /// ```
    /// # use confsync_document::Document;
    /// # use serde_json::json;
    /// let doc = Document::try_from(json!({"wechat": {"enabled": true}})).unwrap();
    /// assert_eq!(doc.get("/wechat/enabled"), Some(&json!(true)));
    /// ```
    #[must_use]
    pub fn get(&self, pointer: &str) -> Option<&JsonValue> {
        if pointer.is_empty() {
            return None;
        }
        let rest = pointer.strip_prefix('/')?;
        let mut tokens = rest.split('/').map(unescape_token);
        let first = tokens.next()?;
        tokens.try_fold(self.0.get(&first)?, |current, token| match current {
            JsonValue::Object(map) => map.get(&token),
            JsonValue::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Top-level field lookup
    #[inline]
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Whether a top-level field exists
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of top-level fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document has no fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Top-level field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Borrow the underlying map
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    #[inline]
    pub(crate) fn as_map_mut(&mut self) -> &mut Map<String, JsonValue> {
        &mut self.0
    }

    /// Convert into a plain JSON value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.0)
    }

    /// Convert to typed struct
    ///
    /// # Errors
    /// Returns error if the document doesn't match the type
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, DocumentError> {
        Ok(serde_json::from_value(JsonValue::Object(self.0.clone()))?)
    }

    /// Create from typed struct
    ///
    /// # Errors
    /// Returns error if the value doesn't serialize to a JSON object
    pub fn from_typed<T: Serialize>(value: &T) -> Result<Self, DocumentError> {
        let json = serde_json::to_value(value)?;
        Self::try_from(json)
    }

    /// Merge `patch` over this document, returning a new document
    #[inline]
    #[must_use]
    pub fn merged(&self, patch: &Document) -> Self {
        merge::merge(self, patch)
    }

    /// Merge `patch` into this document in place
    #[inline]
    pub fn merge_from(&mut self, patch: &Document) {
        merge::merge_into(self, patch);
    }

    /// Canonical JSON (sorted keys, no whitespace)
    #[must_use]
    pub fn to_canonical_json(&self) -> String {
        canonical_json(&JsonValue::Object(self.0.clone()))
    }

    /// Content hash over the canonical JSON form
    #[inline]
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::compute(self.to_canonical_json().as_bytes())
    }

    /// Serialize to pretty JSON string
    ///
    /// # Errors
    /// Returns error if serialization fails (rare for JSON)
    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }
}

impl TryFrom<JsonValue> for Document {
    type Error = DocumentError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Object(map) => Ok(Self(map)),
            other => Err(DocumentError::NotAnObject(json_kind(&other))),
        }
    }
}

impl From<Document> for JsonValue {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

impl From<Map<String, JsonValue>> for Document {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

/// Document error types
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Text was not valid JSON, or didn't match the requested type
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Root value was not an object
    #[error("document root must be an object, found {0}")]
    NotAnObject(&'static str),

    /// JSON pointer was malformed
    #[error("invalid JSON pointer: {0:?}")]
    InvalidPointer(String),
}

/// Name of a JSON value's kind, for error messages
#[must_use]
pub fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn canonical_json(value: &JsonValue) -> String {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();

            let parts: Vec<String> = keys
                .into_iter()
                .filter_map(|key| {
                    map.get(key)
                        .map(|val| format!("{}:{}", JsonValue::from(key.as_str()), canonical_json(val)))
                })
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        JsonValue::Array(arr) => {
            let parts: Vec<_> = arr.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        scalar => scalar.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_from_json() {
        let doc = Document::from_json(r#"{"name": "test", "value": 42}"#).unwrap();
        assert_eq!(doc.get("/name"), Some(&json!("test")));
        assert_eq!(doc.get("/value"), Some(&json!(42)));
    }

    #[test]
    fn document_rejects_non_object_root() {
        let err = Document::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, DocumentError::NotAnObject("array")));
        assert!(Document::from_json("not json").is_err());
    }

    #[test]
    fn document_deserialize_rejects_scalar_root() {
        assert!(serde_json::from_str::<Document>("42").is_err());
        assert!(serde_json::from_str::<Document>("{}").unwrap().is_empty());
    }

    #[test]
    fn document_get_walks_arrays() {
        let doc = Document::try_from(json!({"accounts": [{"id": "a"}, {"id": "b"}]})).unwrap();
        assert_eq!(doc.get("/accounts/1/id"), Some(&json!("b")));
        assert_eq!(doc.get("/accounts/7/id"), None);
        assert_eq!(doc.get("accounts"), None);
    }

    #[test]
    fn patch_at_builds_nested_patch() {
        let patch = Document::patch_at("/api/ProviderA/model", json!("gpt")).unwrap();
        assert_eq!(
            patch.into_value(),
            json!({"api": {"ProviderA": {"model": "gpt"}}})
        );
    }

    #[test]
    fn patch_at_unescapes_tokens() {
        let patch = Document::patch_at("/paths/a~1b/c~0d", json!(1)).unwrap();
        assert_eq!(patch.into_value(), json!({"paths": {"a/b": {"c~d": 1}}}));
    }

    #[test]
    fn patch_at_root_requires_object() {
        assert!(Document::patch_at("", json!({"a": 1})).is_ok());
        assert!(Document::patch_at("", json!(1)).is_err());
        assert!(matches!(
            Document::patch_at("no-slash", json!(1)),
            Err(DocumentError::InvalidPointer(_))
        ));
    }

    #[test]
    fn canonical_hash_ignores_key_order() {
        let a = Document::from_json(r#"{"b": 1, "a": {"y": 2, "x": 3}}"#).unwrap();
        let b = Document::from_json(r#"{"a": {"x": 3, "y": 2}, "b": 1}"#).unwrap();
        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a.to_canonical_json(), r#"{"a":{"x":3,"y":2},"b":1}"#);
    }

    #[test]
    fn canonical_json_escapes_strings() {
        let doc = Document::try_from(json!({"q\"k": "line\nbreak"})).unwrap();
        assert_eq!(doc.to_canonical_json(), r#"{"q\"k":"line\nbreak"}"#);
    }

    #[test]
    fn typed_roundtrip() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Wechat {
            enabled: bool,
            app_id: String,
        }

        let typed = Wechat {
            enabled: true,
            app_id: "wx1".to_string(),
        };
        let doc = Document::from_typed(&typed).unwrap();
        assert_eq!(doc.get("/app_id"), Some(&json!("wx1")));
        assert_eq!(doc.to_typed::<Wechat>().unwrap(), typed);
    }
}
