#![deny(missing_docs)]

//! # Pipeline
//!
//! Load → resolve → collect → compose → convert → write, in strict sequence.
//! The first failure aborts the run; files already written stay in place.

use crate::collector::{collect, TitlePolicy};
use crate::composer::{compose, CompositeSpec};
use crate::dialect::{ConvertOptions, DialectConverter};
use crate::document::load_document;
use crate::error::AppResult;
use crate::registry::SchemaRegistry;
use crate::resolver::{resolve, CircularPolicy};
use crate::writer::{DirectorySink, SchemaSink};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Settings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Reference cycle handling.
    pub circular: CircularPolicy,
    /// Handling of untitled body schemas.
    pub titles: TitlePolicy,
    /// Schemas to synthesize after collection.
    pub composites: Vec<CompositeSpec>,
    /// Dialect conversion settings.
    pub convert: ConvertOptions,
}

/// Outcome of [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Files written, in registry order.
    pub written: Vec<PathBuf>,
}

/// Resolves, collects, composes and converts; no I/O.
pub fn extract_schemas(document: &Value, options: &PipelineOptions) -> AppResult<SchemaRegistry> {
    let resolved = resolve(document, options.circular)?;
    let registry = collect(&resolved, options.titles)?;
    let mut registry = compose(registry, &options.composites)?;

    let converter = DialectConverter::new(options.convert.clone());
    for (_, schema) in registry.schemas_mut() {
        *schema = converter.convert(schema);
    }
    Ok(registry)
}

/// Writes every registry entry to `sink`, in registry order.
pub fn write_all(registry: &SchemaRegistry, sink: &mut impl SchemaSink) -> AppResult<()> {
    for entry in registry.iter() {
        sink.write_schema(&entry.title, &entry.schema)?;
    }
    Ok(())
}

/// Runs the whole pipeline from `input` into the `out_dir` directory.
pub fn run(input: &Path, out_dir: &Path, options: &PipelineOptions) -> AppResult<RunReport> {
    let document = load_document(input)?;
    let registry = extract_schemas(&document, options)?;

    let mut sink = DirectorySink::create(out_dir)?;
    write_all(&registry, &mut sink)?;

    let written = sink.into_written();
    tracing::info!(
        count = written.len(),
        out_dir = %out_dir.display(),
        "wrote JSON schemas"
    );
    Ok(RunReport { written })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct MemorySink {
        files: BTreeMap<String, Value>,
        fail_on: Option<&'static str>,
    }

    impl SchemaSink for MemorySink {
        fn write_schema(&mut self, title: &str, schema: &Value) -> AppResult<()> {
            if self.fail_on == Some(title) {
                return Err(AppError::Write {
                    path: PathBuf::from(title),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.files.insert(title.to_string(), schema.clone());
            Ok(())
        }
    }

    fn document() -> Value {
        json!({
            "openapi": "3.0.3",
            "paths": {
                "/a": { "post": { "requestBody": { "content": { "application/json": {
                    "schema": { "$ref": "#/components/schemas/Foo" }
                } } } } },
                "/b": { "get": { "responses": { "200": { "content": { "application/json": {
                    "schema": { "title": "Bar", "type": "object",
                                "properties": { "y": { "type": "integer", "nullable": true } },
                                "required": ["y"] }
                } } } } } }
            },
            "components": { "schemas": {
                "Foo": { "title": "Foo", "type": "object",
                         "properties": { "x": { "type": "string", "example": "hi" } },
                         "required": ["x"] }
            } }
        })
    }

    #[test]
    fn test_extract_converts_every_entry() {
        let registry = extract_schemas(&document(), &PipelineOptions::default()).unwrap();
        assert_eq!(registry.titles(), ["Foo", "Bar"]);

        let foo = &registry.get("Foo").unwrap().schema;
        assert_eq!(foo["$schema"], "https://json-schema.org/draft/2020-12/schema");
        assert_eq!(foo["properties"]["x"]["examples"], json!(["hi"]));

        let bar = &registry.get("Bar").unwrap().schema;
        assert_eq!(bar["properties"]["y"]["type"], json!(["integer", "null"]));
        assert_eq!(bar["title"], "Bar");
    }

    #[test]
    fn test_extract_with_composite() {
        let options = PipelineOptions {
            composites: vec![CompositeSpec::new("FooBar", ["Foo", "Bar"])],
            ..PipelineOptions::default()
        };
        let registry = extract_schemas(&document(), &options).unwrap();
        let combined = &registry.get("FooBar").unwrap().schema;
        assert_eq!(combined["required"], json!(["x", "y"]));
        // Composition happens before conversion, so composites are converted too.
        assert_eq!(combined["properties"]["y"]["type"], json!(["integer", "null"]));
    }

    #[test]
    fn test_write_all_stops_at_first_failure() {
        let registry = extract_schemas(&document(), &PipelineOptions::default()).unwrap();
        let mut sink = MemorySink {
            fail_on: Some("Bar"),
            ..MemorySink::default()
        };
        let err = write_all(&registry, &mut sink).unwrap_err();
        assert!(matches!(err, AppError::Write { .. }));
        assert_eq!(sink.files.keys().collect::<Vec<_>>(), ["Foo"]);
    }
}
