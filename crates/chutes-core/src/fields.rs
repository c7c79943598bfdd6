//! The caller-supplied bag of semantic fields.
//!
//! Field names come from a fixed vocabulary (see [`SEMANTIC_FIELDS`]); the
//! engine reads the bag and never modifies it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Every semantic field name the engine knows how to translate.
pub const SEMANTIC_FIELDS: &[&str] = &[
    "prompt",
    "negative_prompt",
    "image",
    "images",
    "seed",
    "resolution",
    "width",
    "height",
    "steps",
    "guidance_scale",
    "fps",
    "frames",
    "text",
    "voice",
    "speed",
    "audio",
    "language",
    "input",
    "model",
];

/// Flat, uniform input for one operation.
///
/// Values are JSON primitives or arrays of base64 strings. Unknown keys are
/// accepted here and dropped later by the request adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SemanticFieldBag {
    values: Map<String, Value>,
}

impl SemanticFieldBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a field; `null` values are ignored.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        if !value.is_null() {
            self.values.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Numeric field, accepting numbers or numeric strings (host forms often
    /// hand everything over as text).
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.values.get(name)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether `name` is part of the semantic vocabulary.
    pub fn is_semantic(name: &str) -> bool {
        SEMANTIC_FIELDS.contains(&name)
    }
}

impl From<Map<String, Value>> for SemanticFieldBag {
    fn from(values: Map<String, Value>) -> Self {
        let mut bag = Self::new();
        for (name, value) in values {
            bag.insert(name, value);
        }
        bag
    }
}

impl TryFrom<Value> for SemanticFieldBag {
    type Error = crate::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(map.into()),
            other => Err(crate::Error::config_error(format!(
                "Semantic fields must be a JSON object, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_accessors() {
        let bag = SemanticFieldBag::new()
            .with("prompt", "a cat")
            .with("frames", 81)
            .with("steps", "30");

        assert_eq!(bag.get_str("prompt"), Some("a cat"));
        assert_eq!(bag.get_u64("frames"), Some(81));
        assert_eq!(bag.get_u64("steps"), Some(30));
        assert_eq!(bag.len(), 3);
    }

    #[test]
    fn test_null_values_are_skipped() {
        let bag = SemanticFieldBag::new().with("seed", Value::Null);
        assert!(bag.is_empty());
    }

    #[test]
    fn test_try_from_value() {
        let bag = SemanticFieldBag::try_from(json!({"prompt": "x", "seed": null})).unwrap();
        assert!(bag.contains("prompt"));
        assert!(!bag.contains("seed"));

        assert!(SemanticFieldBag::try_from(json!(["prompt"])).is_err());
    }

    #[test]
    fn test_vocabulary() {
        assert!(SemanticFieldBag::is_semantic("images"));
        assert!(!SemanticFieldBag::is_semantic("image_b64s"));
    }
}
