#![deny(missing_docs)]

//! # Schema Registry
//!
//! Ordered title → schema map shared by the collector, composer, converter
//! and writer.
//!
//! Entries keep the position of the first discovery of their title. A later
//! insert under the same title replaces the entry in place and hands the
//! previous one back, so collisions are observable instead of accidental.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// The body part of an operation a schema was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPart {
    /// `requestBody.content.<media_type>.schema`
    RequestBody {
        /// Media type key, e.g. `application/json`.
        media_type: String,
    },
    /// `responses.<status>.content.<media_type>.schema`
    Response {
        /// Response code key, e.g. `200` or `default`.
        status: String,
        /// Media type key.
        media_type: String,
    },
}

/// Where in the document a schema was discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaLocation {
    /// Path template, e.g. `/users/{id}`.
    pub path: String,
    /// Operation key, e.g. `post`.
    pub method: String,
    /// Request or response body.
    pub part: BodyPart,
}

impl fmt::Display for SchemaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.part {
            BodyPart::RequestBody { media_type } => write!(
                f,
                "{} {} requestBody ({})",
                self.path, self.method, media_type
            ),
            BodyPart::Response { status, media_type } => write!(
                f,
                "{} {} responses {} ({})",
                self.path, self.method, status, media_type
            ),
        }
    }
}

/// How an entry got into the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOrigin {
    /// Found on an operation body.
    Operation(SchemaLocation),
    /// Synthesized by the composer from these titles, in order.
    Composite(Vec<String>),
}

/// A titled schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEntry {
    /// Registry key; also the output file stem.
    pub title: String,
    /// Standalone schema document.
    pub schema: Value,
    /// Discovery origin.
    pub origin: SchemaOrigin,
}

/// Ordered map from title to [`SchemaEntry`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRegistry {
    entries: IndexMap<String, SchemaEntry>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry` under its title, returning the entry it replaced.
    pub fn insert(&mut self, entry: SchemaEntry) -> Option<SchemaEntry> {
        let previous = self.entries.insert(entry.title.clone(), entry);
        if let Some(prev) = &previous {
            tracing::debug!(title = %prev.title, "schema title redefined, keeping the latest");
        }
        previous
    }

    /// Looks up an entry by title.
    pub fn get(&self, title: &str) -> Option<&SchemaEntry> {
        self.entries.get(title)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Titles in registry order.
    pub fn titles(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Entries in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries.values()
    }

    /// Mutable entries in registry order. Titles cannot change through this.
    pub fn schemas_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.entries
            .iter_mut()
            .map(|(title, entry)| (title.as_str(), &mut entry.schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(title: &str, schema: Value) -> SchemaEntry {
        SchemaEntry {
            title: title.to_string(),
            schema,
            origin: SchemaOrigin::Composite(Vec::new()),
        }
    }

    #[test]
    fn test_overwrite_returns_previous_and_keeps_position() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.insert(entry("A", json!({"v": 1}))).is_none());
        registry.insert(entry("B", json!({})));

        let previous = registry.insert(entry("A", json!({"v": 2}))).unwrap();
        assert_eq!(previous.schema, json!({"v": 1}));
        assert_eq!(registry.titles(), ["A", "B"]);
        assert_eq!(registry.get("A").unwrap().schema, json!({"v": 2}));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_schemas_mut_rewrites_in_place() {
        let mut registry = SchemaRegistry::new();
        registry.insert(entry("A", json!({"title": "A"})));
        for (title, schema) in registry.schemas_mut() {
            schema["x-seen"] = json!(title);
        }
        assert_eq!(registry.get("A").unwrap().schema["x-seen"], "A");
    }

    #[test]
    fn test_location_display() {
        let request = SchemaLocation {
            path: "/a".into(),
            method: "post".into(),
            part: BodyPart::RequestBody {
                media_type: "application/json".into(),
            },
        };
        assert_eq!(request.to_string(), "/a post requestBody (application/json)");
    }
}
