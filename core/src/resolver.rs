#![deny(missing_docs)]

//! # Reference Resolution
//!
//! Replaces every local `$ref` with the subtree it points to.
//!
//! The input tree is borrowed, never rewritten. Completed targets are
//! memoized by [`Locator`], and targets that are still being expanded are
//! tracked in an ordered set so a revisit can be reported (or aliased) with
//! the full chain.

mod node;

pub use node::{Node, ResolvedDocument, SharedId, SharedNode};

use crate::error::{AppError, AppResult};
use crate::pointer::Locator;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::collections::HashMap;

/// What to do when a reference chain revisits a target that is still open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CircularPolicy {
    /// Fail with [`AppError::CircularReference`].
    #[default]
    Reject,
    /// Alias the open target through the shared arena ([`Node::Shared`]).
    Share,
}

/// Dereferences `document` under the given cycle policy.
pub fn resolve(document: &Value, policy: CircularPolicy) -> AppResult<ResolvedDocument> {
    let mut resolver = Resolver {
        root: document,
        self_uri: document.get("$self").and_then(Value::as_str),
        policy,
        open: IndexSet::new(),
        done: HashMap::new(),
        shared: IndexMap::new(),
    };

    let root = resolver.resolve_value(document)?;
    tracing::info!(
        targets = resolver.done.len(),
        shared = resolver.shared.len(),
        "resolved references"
    );

    // Every slot is filled when the frame that opened it closes.
    let shared = resolver
        .shared
        .into_iter()
        .map(|(locator, node)| SharedNode {
            locator,
            node: node.unwrap_or(Node::Null),
        })
        .collect();

    Ok(ResolvedDocument { root, shared })
}

struct Resolver<'a> {
    root: &'a Value,
    self_uri: Option<&'a str>,
    policy: CircularPolicy,
    open: IndexSet<Locator>,
    done: HashMap<Locator, Node>,
    shared: IndexMap<Locator, Option<Node>>,
}

impl<'a> Resolver<'a> {
    fn resolve_value(&mut self, value: &'a Value) -> AppResult<Node> {
        match value {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                    let target = self.resolve_reference(reference)?;
                    if map.len() == 1 {
                        return Ok(target);
                    }
                    return self.overlay_siblings(reference, target, map);
                }

                let mut out = IndexMap::with_capacity(map.len());
                for (key, v) in map {
                    out.insert(key.clone(), self.resolve_value(v)?);
                }
                Ok(Node::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item))
                .collect::<AppResult<Vec<_>>>()
                .map(Node::Array),
            Value::Null => Ok(Node::Null),
            Value::Bool(b) => Ok(Node::Bool(*b)),
            Value::Number(n) => Ok(Node::Number(n.clone())),
            Value::String(s) => Ok(Node::String(s.clone())),
        }
    }

    /// Lays the members next to a `$ref` over its resolved target.
    fn overlay_siblings(
        &mut self,
        reference: &str,
        target: Node,
        map: &'a serde_json::Map<String, Value>,
    ) -> AppResult<Node> {
        let siblings = map.iter().filter(|(key, _)| key.as_str() != "$ref");
        match target {
            Node::Object(mut obj) => {
                for (key, v) in siblings {
                    obj.insert(key.clone(), self.resolve_value(v)?);
                }
                Ok(Node::Object(obj))
            }
            // The alias must stay untouched, so the siblings wrap it instead.
            Node::Shared(id) => {
                let mut obj = IndexMap::with_capacity(map.len());
                obj.insert("allOf".to_string(), Node::Array(vec![Node::Shared(id)]));
                for (key, v) in siblings {
                    obj.insert(key.clone(), self.resolve_value(v)?);
                }
                Ok(Node::Object(obj))
            }
            other => {
                tracing::warn!(reference, "ignoring $ref siblings: target is not an object");
                Ok(other)
            }
        }
    }

    fn resolve_reference(&mut self, reference: &str) -> AppResult<Node> {
        let locator =
            Locator::parse(reference, self.self_uri).map_err(|reason| AppError::DanglingReference {
                reference: reference.to_string(),
                reason,
            })?;

        if let Some(node) = self.done.get(&locator) {
            return Ok(node.clone());
        }

        if let Some(position) = self.open.get_index_of(&locator) {
            return match self.policy {
                CircularPolicy::Reject => Err(AppError::CircularReference {
                    chain: self.chain_from(position, &locator),
                }),
                CircularPolicy::Share => {
                    let entry = self.shared.entry(locator);
                    let id = SharedId(entry.index());
                    tracing::debug!(locator = %entry.key(), "aliasing circular reference");
                    entry.or_insert(None);
                    Ok(Node::Shared(id))
                }
            };
        }

        let target = self.lookup(&locator, reference)?;
        self.open.insert(locator.clone());
        let resolved = self.resolve_value(target);
        self.open.pop();
        let node = resolved?;

        if let Some(slot) = self.shared.get_mut(&locator) {
            // A cycle made only of references never reaches a concrete schema.
            if matches!(node, Node::Shared(_)) {
                return Err(AppError::CircularReference {
                    chain: vec![locator.to_string(), locator.to_string()],
                });
            }
            *slot = Some(node.clone());
        }

        self.done.insert(locator, node.clone());
        Ok(node)
    }

    fn chain_from(&self, position: usize, closing: &Locator) -> Vec<String> {
        self.open
            .iter()
            .skip(position)
            .chain(std::iter::once(closing))
            .map(ToString::to_string)
            .collect()
    }

    /// Walks `locator` from the document root, following `$ref`s it passes through.
    fn lookup(&self, locator: &Locator, reference: &str) -> AppResult<&'a Value> {
        let mut hops = vec![locator.clone()];
        self.walk(locator, reference, &mut hops)
    }

    fn walk(
        &self,
        locator: &Locator,
        reference: &str,
        hops: &mut Vec<Locator>,
    ) -> AppResult<&'a Value> {
        let mut current = self.root;
        for segment in locator.segments() {
            let mut base = current;
            current = loop {
                if let Some(next) = child(base, segment) {
                    break next;
                }
                let Some(inner) = ref_target(base) else {
                    return Err(AppError::DanglingReference {
                        reference: reference.to_string(),
                        reason: format!("no member '{}' under {}", segment, locator),
                    });
                };
                let inner_locator = Locator::parse(inner, self.self_uri).map_err(|reason| {
                    AppError::DanglingReference {
                        reference: inner.to_string(),
                        reason,
                    }
                })?;
                if hops.contains(&inner_locator) {
                    let mut chain: Vec<String> = hops.iter().map(ToString::to_string).collect();
                    chain.push(inner_locator.to_string());
                    return Err(AppError::CircularReference { chain });
                }
                hops.push(inner_locator.clone());
                base = self.walk(&inner_locator, inner, hops)?;
            };
        }
        Ok(current)
    }
}

fn child<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn ref_target(value: &Value) -> Option<&str> {
    value.get("$ref").and_then(Value::as_str)
}
