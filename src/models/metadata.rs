use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Display};

/// Free-form post metadata, keyed by attribute name.
///
/// A `BTreeMap` keeps iteration order fixed so feature vectors built from the
/// same metadata always accumulate in the same order.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A scalar metadata value as delivered by the upstream catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

/// Renders the value the way it appears inside a feature key.
///
/// Booleans are `true`/`false`, null is `null`, numbers use serde_json's
/// locale-independent formatting (`3`, `2.5`) and text is passed through.
impl Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataValue::Null => write!(f, "null"),
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Number(n) => write!(f, "{}", n),
            MetadataValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<serde_json::Value> for MetadataValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => MetadataValue::Null,
            serde_json::Value::Bool(b) => MetadataValue::Bool(b),
            serde_json::Value::Number(n) => MetadataValue::Number(n),
            serde_json::Value::String(s) => MetadataValue::Text(s),
            // Nested values are flattened to their JSON text
            other => MetadataValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

/// Converts a raw JSON document into post metadata.
///
/// Only JSON objects carry metadata; any other shape yields an empty map.
pub fn metadata_from_json(value: serde_json::Value) -> Metadata {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| (key, MetadataValue::from(value)))
            .collect(),
        _ => Metadata::new(),
    }
}

/// Converts post metadata back into a JSON object for storage
pub fn metadata_to_json(metadata: &Metadata) -> serde_json::Value {
    serde_json::to_value(metadata).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_scalars() {
        assert_eq!(MetadataValue::Text("Calm".to_string()).to_string(), "Calm");
        assert_eq!(MetadataValue::Bool(true).to_string(), "true");
        assert_eq!(MetadataValue::Bool(false).to_string(), "false");
        assert_eq!(MetadataValue::Null.to_string(), "null");
    }

    #[test]
    fn test_display_numbers_are_locale_independent() {
        let int = MetadataValue::from(json!(1200));
        let float = MetadataValue::from(json!(2.5));
        assert_eq!(int.to_string(), "1200");
        assert_eq!(float.to_string(), "2.5");
    }

    #[test]
    fn test_metadata_from_object() {
        let metadata = metadata_from_json(json!({
            "mood": "calm",
            "duration": 30,
            "featured": false,
            "tags": ["a", "b"]
        }));

        assert_eq!(metadata.len(), 4);
        assert_eq!(metadata["mood"], MetadataValue::Text("calm".to_string()));
        assert_eq!(metadata["featured"], MetadataValue::Bool(false));
        assert_eq!(metadata["tags"], MetadataValue::Text(r#"["a","b"]"#.to_string()));
    }

    #[test]
    fn test_metadata_from_non_object_is_empty() {
        assert!(metadata_from_json(json!(null)).is_empty());
        assert!(metadata_from_json(json!("text")).is_empty());
        assert!(metadata_from_json(json!([1, 2])).is_empty());
    }

    #[test]
    fn test_metadata_serde_untagged() {
        let metadata = metadata_from_json(json!({"mood": "calm", "n": 3, "x": null}));
        let encoded = serde_json::to_string(&metadata).unwrap();
        assert_eq!(encoded, r#"{"mood":"calm","n":3,"x":null}"#);

        let decoded: Metadata = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, metadata);
    }
}
