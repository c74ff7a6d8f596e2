//! Resolved tree nodes and the shared-subtree arena.

use crate::pointer::{encode_pointer_segment, Locator};
use indexmap::{IndexMap, IndexSet};
use serde_json::{json, Map, Number, Value};
use std::collections::HashSet;

/// Index of a subtree in [`ResolvedDocument::shared`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SharedId(pub(crate) usize);

/// A dereferenced document node.
///
/// Mirrors a JSON value, plus [`Node::Shared`] for the edge that closes a
/// reference cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `null`
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(Number),
    /// A string.
    String(String),
    /// An ordered sequence.
    Array(Vec<Node>),
    /// An ordered mapping.
    Object(IndexMap<String, Node>),
    /// Alias of an arena subtree that was still being expanded when it was
    /// referenced again.
    Shared(SharedId),
}

impl Node {
    /// Returns the mapping if this node is an object.
    pub fn as_object(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the string if this node is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    /// Member lookup on object nodes.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_object().and_then(|map| map.get(key))
    }
}

/// An arena entry: the resolved subtree of a target that closes a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedNode {
    /// Where the subtree lives in the source document.
    pub locator: Locator,
    /// Its resolved content. Never a bare [`Node::Shared`].
    pub node: Node,
}

/// The output of reference resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDocument {
    pub(crate) root: Node,
    pub(crate) shared: Vec<SharedNode>,
}

impl ResolvedDocument {
    /// The dereferenced document root.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Subtrees aliased by [`Node::Shared`], indexed by [`SharedId`].
    pub fn shared(&self) -> &[SharedNode] {
        &self.shared
    }

    /// Looks through a shared alias to the subtree it names.
    pub fn follow<'a>(&'a self, node: &'a Node) -> &'a Node {
        match node {
            Node::Shared(id) => self
                .shared
                .get(id.0)
                .map(|entry| &entry.node)
                .unwrap_or(node),
            other => other,
        }
    }

    /// Converts the whole tree back into a JSON value.
    ///
    /// Without shared subtrees this is the exact input document.
    pub fn to_value(&self) -> Value {
        self.materialize(&self.root)
    }

    /// Converts `node` into a standalone JSON value.
    ///
    /// Every shared alias becomes `{"$ref": "#/$defs/<name>"}` and each
    /// reachable arena entry is emitted once under the result's `$defs`.
    pub fn materialize(&self, node: &Node) -> Value {
        let start = self.follow(node);
        let reachable = self.reachable_shared(start);
        if reachable.is_empty() {
            return to_json(start, &IndexMap::new());
        }

        let mut taken: HashSet<String> = start
            .get("$defs")
            .and_then(Node::as_object)
            .map(|defs| defs.keys().cloned().collect())
            .unwrap_or_default();
        let mut names = IndexMap::with_capacity(reachable.len());
        for id in &reachable {
            let base = self.shared[id.0].locator.name();
            let mut name = base.to_string();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            names.insert(*id, name);
        }

        let mut value = to_json(start, &names);
        match &mut value {
            Value::Object(map) => {
                let defs = map
                    .entry("$defs")
                    .or_insert_with(|| Value::Object(Map::new()));
                if !defs.is_object() {
                    *defs = Value::Object(Map::new());
                }
                if let Value::Object(defs) = defs {
                    for (id, name) in &names {
                        defs.insert(name.clone(), to_json(&self.shared[id.0].node, &names));
                    }
                }
            }
            _ => tracing::warn!("shared definitions dropped: schema root is not an object"),
        }
        value
    }

    fn reachable_shared(&self, start: &Node) -> IndexSet<SharedId> {
        let mut found = IndexSet::new();
        let mut pending = vec![start];
        while let Some(node) = pending.pop() {
            match node {
                Node::Shared(id) => {
                    if found.insert(*id) {
                        if let Some(entry) = self.shared.get(id.0) {
                            pending.push(&entry.node);
                        }
                    }
                }
                Node::Array(items) => pending.extend(items.iter().rev()),
                Node::Object(map) => pending.extend(map.values().rev()),
                _ => {}
            }
        }
        found
    }
}

fn to_json(node: &Node, names: &IndexMap<SharedId, String>) -> Value {
    match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Number(n) => Value::Number(n.clone()),
        Node::String(s) => Value::String(s.clone()),
        Node::Array(items) => Value::Array(items.iter().map(|n| to_json(n, names)).collect()),
        Node::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_json(v, names)))
                .collect(),
        ),
        Node::Shared(id) => {
            let name = names
                .get(id)
                .map(String::as_str)
                .unwrap_or("unknown");
            json!({ "$ref": format!("#/$defs/{}", encode_pointer_segment(name)) })
        }
    }
}
