#![deny(missing_docs)]

//! # Schema Composition
//!
//! Synthesizes object schemas by merging the `properties` and `required`
//! lists of schemas already in the registry.

use crate::error::{AppError, AppResult};
use crate::pointer::{decode_pointer_segment, encode_pointer_segment};
use crate::registry::{SchemaEntry, SchemaOrigin, SchemaRegistry};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A schema to synthesize: `title` built from `sources`, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeSpec {
    /// Title of the new schema.
    pub title: String,
    /// Titles of the parts, merged left to right.
    pub sources: Vec<String>,
}

impl CompositeSpec {
    /// Creates a spec from a title and its source titles.
    pub fn new(title: impl Into<String>, sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            title: title.into(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parses `NAME=SRC1,SRC2,...`.
impl FromStr for CompositeSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (title, sources) = s
            .split_once('=')
            .ok_or_else(|| format!("invalid NAME=A,B: no `=` found in `{}`", s))?;
        let title = title.trim();
        if title.is_empty() {
            return Err(format!("invalid NAME=A,B: empty name in `{}`", s));
        }
        let sources: Vec<String> = sources
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect();
        if sources.is_empty() {
            return Err(format!("invalid NAME=A,B: no sources in `{}`", s));
        }
        Ok(Self::new(title, sources))
    }
}

impl fmt::Display for CompositeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.title, self.sources.join(","))
    }
}

/// Applies `specs` in order and returns the extended registry.
///
/// A spec may use composites produced by earlier specs.
pub fn compose(mut registry: SchemaRegistry, specs: &[CompositeSpec]) -> AppResult<SchemaRegistry> {
    for spec in specs {
        let schema = merge_sources(&registry, spec)?;
        tracing::debug!(composite = %spec, "composed schema");
        registry.insert(SchemaEntry {
            title: spec.title.clone(),
            schema,
            origin: SchemaOrigin::Composite(spec.sources.clone()),
        });
    }
    Ok(registry)
}

fn merge_sources(registry: &SchemaRegistry, spec: &CompositeSpec) -> AppResult<Value> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    let mut defs = Map::new();

    for source in &spec.sources {
        let entry = registry.get(source).ok_or_else(|| AppError::UnknownSchema {
            title: source.clone(),
            composite: spec.title.clone(),
            known: registry.titles(),
        })?;

        let renames = entry
            .schema
            .get("$defs")
            .and_then(Value::as_object)
            .map(|source_defs| merge_defs(&mut defs, source_defs))
            .unwrap_or_default();
        if !renames.is_empty() {
            tracing::debug!(source = %source, renamed = renames.len(), "renamed colliding $defs");
        }

        if let Some(props) = entry.schema.get("properties").and_then(Value::as_object) {
            for (name, schema) in props {
                let mut schema = schema.clone();
                rewrite_def_refs(&mut schema, &renames);
                properties.insert(name.clone(), schema);
            }
        }
        if let Some(req) = entry.schema.get("required").and_then(Value::as_array) {
            required.extend(req.iter().cloned());
        }
    }

    let mut schema = Map::new();
    schema.insert("title".to_string(), Value::String(spec.title.clone()));
    schema.insert("type".to_string(), Value::String("object".to_string()));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    if !defs.is_empty() {
        schema.insert("$defs".to_string(), Value::Object(defs));
    }
    Ok(Value::Object(schema))
}

/// Moves `source_defs` into `defs`.
///
/// A name already taken by a different schema gets a `_N` suffix; the
/// returned map (old name to new name) must be applied to every `$ref` of
/// the source. Identical definitions are stored once.
fn merge_defs(
    defs: &mut Map<String, Value>,
    source_defs: &Map<String, Value>,
) -> HashMap<String, String> {
    let mut renames = HashMap::new();
    // A rename can make a definition that refers to it differ from its
    // namesake, so repeat until no new collision shows up.
    loop {
        let mut renamed = false;
        for (name, schema) in source_defs {
            if renames.contains_key(name) {
                continue;
            }
            let Some(existing) = defs.get(name) else {
                continue;
            };
            let mut candidate = schema.clone();
            rewrite_def_refs(&mut candidate, &renames);
            if *existing != candidate {
                let fresh = free_def_name(name, defs, source_defs, &renames);
                renames.insert(name.clone(), fresh);
                renamed = true;
            }
        }
        if !renamed {
            break;
        }
    }

    for (name, schema) in source_defs {
        let target = renames.get(name).unwrap_or(name);
        if defs.contains_key(target) {
            continue;
        }
        let mut schema = schema.clone();
        rewrite_def_refs(&mut schema, &renames);
        defs.insert(target.clone(), schema);
    }
    renames
}

fn free_def_name(
    base: &str,
    defs: &Map<String, Value>,
    source_defs: &Map<String, Value>,
    renames: &HashMap<String, String>,
) -> String {
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        let taken = defs.contains_key(&candidate)
            || source_defs.contains_key(&candidate)
            || renames.values().any(|used| *used == candidate);
        if !taken {
            return candidate;
        }
        n += 1;
    }
}

/// Points `#/$defs/<old>` references (and pointers below them) at renamed definitions.
fn rewrite_def_refs(value: &mut Value, renames: &HashMap<String, String>) {
    if renames.is_empty() {
        return;
    }
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get_mut("$ref") {
                if let Some(renamed) = renamed_ref(reference, renames) {
                    *reference = renamed;
                }
            }
            for child in map.values_mut() {
                rewrite_def_refs(child, renames);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                rewrite_def_refs(item, renames);
            }
        }
        _ => {}
    }
}

fn renamed_ref(reference: &str, renames: &HashMap<String, String>) -> Option<String> {
    let rest = reference.strip_prefix("#/$defs/")?;
    let (segment, tail) = match rest.split_once('/') {
        Some((segment, tail)) => (segment, Some(tail)),
        None => (rest, None),
    };
    let fresh = renames.get(&decode_pointer_segment(segment))?;
    let mut out = format!("#/$defs/{}", encode_pointer_segment(fresh));
    if let Some(tail) = tail {
        out.push('/');
        out.push_str(tail);
    }
    Some(out)
}
