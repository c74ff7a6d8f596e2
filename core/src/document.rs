#![deny(missing_docs)]

//! # Document Loading
//!
//! Reads an OpenAPI description (YAML or JSON) into an order-preserving
//! `serde_json::Value` tree.
//!
//! Parsing goes through `serde_yaml::Value` first so that YAML-only shapes are
//! normalized before they reach the JSON model:
//! - merge keys (`<<`) are applied,
//! - non-string mapping keys (unquoted `200:` response codes, booleans) are
//!   stringified,
//! - tagged values are unwrapped.

use crate::error::{AppError, AppResult};
use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;
use std::fs;
use std::path::Path;

const INLINE_SOURCE: &str = "<inline>";

/// Parses document text into a JSON value tree.
pub fn parse_document(text: &str) -> AppResult<Value> {
    parse_with_source(text, INLINE_SOURCE)
}

/// Reads and parses the document at `path`.
pub fn load_document(path: &Path) -> AppResult<Value> {
    let source = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|e| AppError::Load {
        source: source.clone(),
        reason: e.to_string(),
    })?;
    tracing::debug!(path = %source, bytes = text.len(), "read input document");
    parse_with_source(&text, &source)
}

fn parse_with_source(text: &str, source: &str) -> AppResult<Value> {
    let load_err = |reason: String| AppError::Load {
        source: source.to_string(),
        reason,
    };

    let mut yaml: YamlValue =
        serde_yaml::from_str(text).map_err(|e| load_err(format!("invalid YAML/JSON: {}", e)))?;
    yaml.apply_merge()
        .map_err(|e| load_err(format!("invalid merge key: {}", e)))?;

    let value = yaml_to_json(yaml).map_err(load_err)?;
    if !value.is_object() {
        return Err(load_err("document root must be a mapping".to_string()));
    }
    Ok(value)
}

fn yaml_to_json(value: YamlValue) -> Result<Value, String> {
    Ok(match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => Value::Number(yaml_number(&n)?),
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        YamlValue::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, v) in mapping {
                map.insert(mapping_key(key)?, yaml_to_json(v)?);
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_number(n: &serde_yaml::Number) -> Result<Number, String> {
    if let Some(i) = n.as_i64() {
        return Ok(Number::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Number::from(u));
    }
    n.as_f64()
        .and_then(Number::from_f64)
        .ok_or_else(|| format!("number '{}' has no JSON representation", n))
}

fn mapping_key(key: YamlValue) -> Result<String, String> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        YamlValue::Tagged(tagged) => mapping_key(tagged.value),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => {
            Err("mapping keys must be scalars".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_unquoted_status_codes_become_strings() {
        let yaml = r#"
paths:
  /a:
    get:
      responses:
        200:
          description: ok
"#;
        let doc = parse_document(yaml).unwrap();
        assert!(doc["paths"]["/a"]["get"]["responses"]["200"].is_object());
    }

    #[test]
    fn test_json_input_keeps_key_order() {
        let doc = parse_document(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#).unwrap();
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_merge_keys_applied() {
        let yaml = r#"
base: &base
  type: object
  title: Base
derived:
  <<: *base
  title: Derived
"#;
        let doc = parse_document(yaml).unwrap();
        assert_eq!(doc["derived"], json!({"type": "object", "title": "Derived"}));
    }

    #[test]
    fn test_scalar_root_rejected() {
        let err = parse_document("just a string").unwrap_err();
        assert!(err.to_string().contains("document root must be a mapping"));
    }

    #[test]
    fn test_invalid_yaml_reports_inline_source() {
        let err = parse_document("paths: [unclosed").unwrap_err();
        match err {
            AppError::Load { source, .. } => assert_eq!(source, "<inline>"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_document_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"openapi: 3.0.3\npaths: {}\n").unwrap();
        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc["openapi"], "3.0.3");
    }

    #[test]
    fn test_load_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, AppError::Load { .. }));
    }
}
