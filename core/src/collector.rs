#![deny(missing_docs)]

//! # Schema Collection
//!
//! Walks every operation of a resolved document and registers the titled
//! schemas attached to request and response bodies.
//!
//! Enumeration order:
//! 1. paths, in document order;
//! 2. operations of a path item, in document order;
//! 3. request body media types, then responses with their media types.
//!
//! Later discoveries of a title overwrite earlier ones.

use crate::error::{AppError, AppResult};
use crate::registry::{BodyPart, SchemaEntry, SchemaLocation, SchemaOrigin, SchemaRegistry};
use crate::resolver::{Node, ResolvedDocument};

/// What to do with a body schema that has no `title`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TitlePolicy {
    /// Fail with [`AppError::MissingTitle`].
    #[default]
    Strict,
    /// Skip the schema.
    Lenient,
}

const OPERATION_KEYS: [&str; 9] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace", "query",
];

/// Collects titled body schemas from `document`.
pub fn collect(document: &ResolvedDocument, policy: TitlePolicy) -> AppResult<SchemaRegistry> {
    let mut collector = Collector {
        document,
        policy,
        registry: SchemaRegistry::new(),
        skipped: 0,
    };

    if let Some(paths) = collector.object_at(document.root().get("paths")) {
        for (path, item) in paths {
            collector.visit_path_item(path, item)?;
        }
    }

    tracing::info!(
        schemas = collector.registry.len(),
        skipped = collector.skipped,
        "collected body schemas"
    );
    Ok(collector.registry)
}

struct Collector<'d> {
    document: &'d ResolvedDocument,
    policy: TitlePolicy,
    registry: SchemaRegistry,
    skipped: usize,
}

type Members = indexmap::IndexMap<String, Node>;

impl<'d> Collector<'d> {
    fn object_at(&self, node: Option<&'d Node>) -> Option<&'d Members> {
        node.map(|n| self.document.follow(n)).and_then(Node::as_object)
    }

    fn visit_path_item(&mut self, path: &str, item: &'d Node) -> AppResult<()> {
        let Some(operations) = self.object_at(Some(item)) else {
            return Ok(());
        };

        for (method, operation) in operations {
            if !OPERATION_KEYS.contains(&method.as_str()) {
                continue;
            }
            let Some(operation) = self.object_at(Some(operation)) else {
                continue;
            };

            if let Some(content) = self
                .object_at(operation.get("requestBody"))
                .and_then(|body| self.object_at(body.get("content")))
            {
                for (media_type, media) in content {
                    let location = SchemaLocation {
                        path: path.to_string(),
                        method: method.clone(),
                        part: BodyPart::RequestBody {
                            media_type: media_type.clone(),
                        },
                    };
                    self.visit_media(media, location)?;
                }
            }

            if let Some(responses) = self.object_at(operation.get("responses")) {
                for (status, response) in responses {
                    let Some(content) = self
                        .object_at(Some(response))
                        .and_then(|r| self.object_at(r.get("content")))
                    else {
                        continue;
                    };
                    for (media_type, media) in content {
                        let location = SchemaLocation {
                            path: path.to_string(),
                            method: method.clone(),
                            part: BodyPart::Response {
                                status: status.clone(),
                                media_type: media_type.clone(),
                            },
                        };
                        self.visit_media(media, location)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn visit_media(&mut self, media: &'d Node, location: SchemaLocation) -> AppResult<()> {
        let Some(schema) = self
            .object_at(Some(media))
            .and_then(|m| m.get("schema"))
        else {
            return Ok(());
        };

        let title = self
            .document
            .follow(schema)
            .get("title")
            .and_then(Node::as_str)
            .filter(|title| !title.is_empty());

        match (title, self.policy) {
            (Some(title), _) => {
                tracing::debug!(title, %location, "found schema");
                let entry = SchemaEntry {
                    title: title.to_string(),
                    schema: self.document.materialize(schema),
                    origin: SchemaOrigin::Operation(location),
                };
                self.registry.insert(entry);
                Ok(())
            }
            (None, TitlePolicy::Strict) => Err(AppError::MissingTitle { location }),
            (None, TitlePolicy::Lenient) => {
                tracing::debug!(%location, "skipping untitled schema");
                self.skipped += 1;
                Ok(())
            }
        }
    }
}
