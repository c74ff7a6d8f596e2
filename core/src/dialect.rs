#![deny(missing_docs)]

//! # Dialect Conversion
//!
//! Rewrites schemas written in the OpenAPI schema dialect into JSON Schema
//! 2020-12.
//!
//! Conversion is driven by a table of [`KeywordRule`]s. Each rule fires on
//! every schema node that carries its keyword; nodes are reached through the
//! subschema positions of JSON Schema only, so literal data (`enum`, `const`,
//! `default`, `examples`) is never rewritten. Constructs without an
//! equivalent are dropped, never reported as errors. `title` is never touched.

use serde_json::{json, Map, Value};
use std::fmt;

/// JSON Schema 2020-12 meta-schema URI.
pub const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

/// A rewrite for one keyword.
///
/// `rewrite` may edit the node in place, or return a replacement for the whole
/// node, which ends rule processing for that node.
#[derive(Clone, Copy)]
pub struct KeywordRule {
    /// Keyword that triggers the rule.
    pub keyword: &'static str,
    /// The rewrite itself.
    pub rewrite: fn(&mut Map<String, Value>) -> Option<Value>,
}

impl fmt::Debug for KeywordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordRule")
            .field("keyword", &self.keyword)
            .finish_non_exhaustive()
    }
}

/// Built-in rules, in application order. Nullability wraps the node, so it
/// runs last.
pub const DEFAULT_RULES: &[KeywordRule] = &[
    KeywordRule {
        keyword: "discriminator",
        rewrite: drop_discriminator,
    },
    KeywordRule {
        keyword: "xml",
        rewrite: drop_xml,
    },
    KeywordRule {
        keyword: "externalDocs",
        rewrite: drop_external_docs,
    },
    KeywordRule {
        keyword: "example",
        rewrite: example_to_examples,
    },
    KeywordRule {
        keyword: "exclusiveMinimum",
        rewrite: exclusive_minimum,
    },
    KeywordRule {
        keyword: "exclusiveMaximum",
        rewrite: exclusive_maximum,
    },
    KeywordRule {
        keyword: "format",
        rewrite: format_constraints,
    },
    KeywordRule {
        keyword: "x-nullable",
        rewrite: nullable_to_type_union,
    },
    KeywordRule {
        keyword: "nullable",
        rewrite: nullable_to_type_union,
    },
];

/// Conversion settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// `$schema` placed first in every converted root; `None` omits it.
    pub dialect: Option<String>,
    /// Keep `x-*` extension keywords instead of stripping them.
    pub keep_extensions: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            dialect: Some(DRAFT_2020_12.to_string()),
            keep_extensions: false,
        }
    }
}

/// Table-driven OpenAPI → JSON Schema converter.
#[derive(Debug, Clone)]
pub struct DialectConverter {
    rules: Vec<KeywordRule>,
    options: ConvertOptions,
}

impl Default for DialectConverter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

impl DialectConverter {
    /// Creates a converter with [`DEFAULT_RULES`].
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            rules: DEFAULT_RULES.to_vec(),
            options,
        }
    }

    /// Appends a rule; it runs after the built-in ones.
    pub fn with_rule(mut self, rule: KeywordRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Converts a standalone schema document.
    pub fn convert(&self, schema: &Value) -> Value {
        let mut out = schema.clone();
        self.convert_node(&mut out);

        if let (Some(dialect), Value::Object(map)) = (&self.options.dialect, &mut out) {
            let body = std::mem::take(map);
            map.insert("$schema".to_string(), Value::String(dialect.clone()));
            for (key, value) in body {
                if key != "$schema" {
                    map.insert(key, value);
                }
            }
        }
        out
    }

    fn convert_node(&self, value: &mut Value) {
        let Value::Object(map) = value else {
            return;
        };
        self.convert_children(map);

        if !self.options.keep_extensions {
            let rules = &self.rules;
            map.retain(|key, _| {
                !key.starts_with("x-") || rules.iter().any(|rule| rule.keyword == key.as_str())
            });
        }

        let mut replacement = None;
        for rule in &self.rules {
            if !map.contains_key(rule.keyword) {
                continue;
            }
            tracing::trace!(keyword = rule.keyword, "rewriting keyword");
            if let Some(new_node) = (rule.rewrite)(map) {
                replacement = Some(new_node);
                break;
            }
        }
        if let Some(new_node) = replacement {
            *value = new_node;
        }
    }

    fn convert_children(&self, map: &mut Map<String, Value>) {
        for (key, child) in map.iter_mut() {
            match key.as_str() {
                "properties" | "patternProperties" | "dependentSchemas" | "$defs"
                | "definitions" => {
                    if let Value::Object(members) = child {
                        for member in members.values_mut() {
                            self.convert_node(member);
                        }
                    }
                }
                "allOf" | "anyOf" | "oneOf" | "prefixItems" => {
                    if let Value::Array(items) = child {
                        for item in items.iter_mut() {
                            self.convert_node(item);
                        }
                    }
                }
                "items" => match child {
                    Value::Array(items) => {
                        for item in items.iter_mut() {
                            self.convert_node(item);
                        }
                    }
                    other => self.convert_node(other),
                },
                "additionalProperties" | "additionalItems" | "not" | "if" | "then" | "else"
                | "contains" | "propertyNames" | "unevaluatedProperties"
                | "unevaluatedItems" => self.convert_node(child),
                _ => {}
            }
        }
    }
}

fn drop_discriminator(map: &mut Map<String, Value>) -> Option<Value> {
    map.shift_remove("discriminator");
    None
}

fn drop_xml(map: &mut Map<String, Value>) -> Option<Value> {
    map.shift_remove("xml");
    None
}

fn drop_external_docs(map: &mut Map<String, Value>) -> Option<Value> {
    map.shift_remove("externalDocs");
    None
}

/// `example: v` becomes `examples: [v]` in the same position.
fn example_to_examples(map: &mut Map<String, Value>) -> Option<Value> {
    if map.contains_key("examples") {
        map.shift_remove("example");
        return None;
    }
    let old = std::mem::take(map);
    for (key, value) in old {
        if key == "example" {
            map.insert("examples".to_string(), Value::Array(vec![value]));
        } else {
            map.insert(key, value);
        }
    }
    None
}

fn exclusive_minimum(map: &mut Map<String, Value>) -> Option<Value> {
    exclusive_bound(map, "exclusiveMinimum", "minimum");
    None
}

fn exclusive_maximum(map: &mut Map<String, Value>) -> Option<Value> {
    exclusive_bound(map, "exclusiveMaximum", "maximum");
    None
}

/// Boolean exclusive flags (OpenAPI 3.0 / draft 4) become numeric bounds.
fn exclusive_bound(map: &mut Map<String, Value>, exclusive: &str, bound: &str) {
    match map.get(exclusive) {
        Some(Value::Bool(true)) => match map.shift_remove(bound) {
            Some(limit) => {
                map.insert(exclusive.to_string(), limit);
            }
            None => {
                map.shift_remove(exclusive);
            }
        },
        Some(Value::Bool(false)) => {
            map.shift_remove(exclusive);
        }
        _ => {}
    }
}

/// Turns OpenAPI-only formats into the constraints they imply.
fn format_constraints(map: &mut Map<String, Value>) -> Option<Value> {
    let (min, max) = match map.get("format").and_then(Value::as_str) {
        Some("int32") => (i64::from(i32::MIN), i64::from(i32::MAX)),
        Some("int64") => (i64::MIN, i64::MAX),
        Some("byte") => {
            if !map.contains_key("contentEncoding") {
                map.insert("contentEncoding".to_string(), json!("base64"));
            }
            return None;
        }
        _ => return None,
    };

    if !map.contains_key("minimum") && !map.contains_key("exclusiveMinimum") {
        map.insert("minimum".to_string(), json!(min));
    }
    if !map.contains_key("maximum") && !map.contains_key("exclusiveMaximum") {
        map.insert("maximum".to_string(), json!(max));
    }
    None
}

/// Rewrites `nullable` / `x-nullable` into JSON Schema null unions.
///
/// With a `type`, `"null"` joins it. Without one (pure composition schemas),
/// the node is wrapped in `anyOf`; `title` is copied and `$defs` is hoisted
/// so root-relative `$ref`s keep resolving.
fn nullable_to_type_union(map: &mut Map<String, Value>) -> Option<Value> {
    let nullable = map
        .get("nullable")
        .and_then(Value::as_bool)
        .unwrap_or(false)
        || map
            .get("x-nullable")
            .and_then(Value::as_bool)
            .unwrap_or(false);

    map.shift_remove("nullable");
    map.shift_remove("x-nullable");

    if !nullable {
        return None;
    }

    if let Some(Value::Array(values)) = map.get_mut("enum") {
        if !values.contains(&Value::Null) {
            values.push(Value::Null);
        }
    }

    match map.get_mut("type") {
        Some(type_val @ Value::String(_)) => {
            if type_val.as_str() != Some("null") {
                let single = type_val.take();
                *type_val = Value::Array(vec![single, json!("null")]);
            }
            None
        }
        Some(Value::Array(types)) => {
            if !types.iter().any(|t| t.as_str() == Some("null")) {
                types.push(json!("null"));
            }
            None
        }
        Some(_) => None,
        None => {
            let mut wrapper = Map::new();
            if let Some(title) = map.get("title") {
                wrapper.insert("title".to_string(), title.clone());
            }
            let defs = map.shift_remove("$defs");
            let inner = std::mem::take(map);
            wrapper.insert(
                "anyOf".to_string(),
                json!([Value::Object(inner), { "type": "null" }]),
            );
            if let Some(defs) = defs {
                wrapper.insert("$defs".to_string(), defs);
            }
            Some(Value::Object(wrapper))
        }
    }
}
