#![deny(missing_docs)]

//! # OAS2JS Core
//!
//! Extracts the titled request/response schemas of an OpenAPI document and
//! turns each into a self-contained JSON Schema document.
//!
//! Stages, in order: [`document`] → [`resolver`] → [`collector`] →
//! [`composer`] → [`dialect`] → [`writer`], wired together by [`pipeline`].

/// Shared error types.
pub mod error;

/// Document loading (YAML / JSON).
pub mod document;

/// `$ref` parsing into local JSON Pointers.
pub mod pointer;

/// Reference resolution with cycle policies.
pub mod resolver;

/// Title-keyed schema registry.
pub mod registry;

/// Body schema discovery.
pub mod collector;

/// Composite schema synthesis.
pub mod composer;

/// OpenAPI → JSON Schema keyword conversion.
pub mod dialect;

/// Output sinks.
pub mod writer;

/// End-to-end wiring.
pub mod pipeline;

pub use collector::{collect, TitlePolicy};
pub use composer::{compose, CompositeSpec};
pub use dialect::{ConvertOptions, DialectConverter, KeywordRule, DRAFT_2020_12};
pub use document::{load_document, parse_document};
pub use error::{AppError, AppResult};
pub use pipeline::{extract_schemas, run, write_all, PipelineOptions, RunReport};
pub use registry::{BodyPart, SchemaEntry, SchemaLocation, SchemaOrigin, SchemaRegistry};
pub use resolver::{resolve, CircularPolicy, Node, ResolvedDocument};
pub use writer::{DirectorySink, SchemaSink};
