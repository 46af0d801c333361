//! Segment trie
//!
//! Nodes live in a flat arena and refer to each other by index, so `insert`
//! can hand back a [`NodeId`] instead of a borrowed node.
//!
//! Segment kinds are decided by the first character:
//!
//! - `:name` - named parameter, captures one segment
//! - `*name` or `*` - wildcard, captures every remaining segment
//! - anything else - static literal
//!
//! Matching prefers static over param over wildcard and never backtracks.
//! An empty segment (the root path) only matches a static `""` child.

use std::collections::HashMap;

use crate::http::{url_decode, PathParams};

/// Index of a node in the arena
pub type NodeId = usize;

/// Name used for a bare `*` wildcard
pub const DEFAULT_WILDCARD: &str = "wildcard";

struct Node<T> {
    statics: HashMap<String, NodeId>,
    param: Option<(String, NodeId)>,
    wildcard: Option<(String, NodeId)>,
    value: Option<T>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self { statics: HashMap::new(), param: None, wildcard: None, value: None }
    }
}

enum Segment<'a> {
    Static(&'a str),
    Param(&'a str),
    Wildcard(&'a str),
}

impl<'a> Segment<'a> {
    fn classify(raw: &'a str) -> Self {
        if let Some(name) = raw.strip_prefix(':') {
            Segment::Param(name)
        } else if let Some(name) = raw.strip_prefix('*') {
            Segment::Wildcard(if name.is_empty() { DEFAULT_WILDCARD } else { name })
        } else {
            Segment::Static(raw)
        }
    }
}

/// Prefix tree over path segments
pub struct Trie<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Trie<T> {
    /// The root node, present in every trie
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self { nodes: vec![Node::new()] }
    }

    fn alloc(&mut self) -> NodeId {
        self.nodes.push(Node::new());
        self.nodes.len() - 1
    }

    /// Walk the segments from the root, creating missing nodes, and return
    /// the terminal node.
    ///
    /// Inserting the same sequence twice yields the same node. An existing
    /// param or wildcard child keeps the name it was first inserted with.
    pub fn insert<S: AsRef<str>>(&mut self, segments: &[S]) -> NodeId {
        let mut current = Self::ROOT;

        for raw in segments {
            current = match Segment::classify(raw.as_ref()) {
                Segment::Static(literal) => match self.nodes[current].statics.get(literal) {
                    Some(&child) => child,
                    None => {
                        let child = self.alloc();
                        self.nodes[current].statics.insert(literal.to_string(), child);
                        child
                    }
                },
                Segment::Param(name) => match &self.nodes[current].param {
                    Some((_, child)) => *child,
                    None => {
                        let child = self.alloc();
                        self.nodes[current].param = Some((name.to_string(), child));
                        child
                    }
                },
                Segment::Wildcard(name) => match &self.nodes[current].wildcard {
                    Some((_, child)) => *child,
                    None => {
                        let child = self.alloc();
                        self.nodes[current].wildcard = Some((name.to_string(), child));
                        child
                    }
                },
            };
        }

        current
    }

    /// Find the node reached by consuming `segments`.
    ///
    /// Captured parameters are written to `params`, URL-decoded. A wildcard
    /// captures the rest of the path joined by `/` and ends the walk.
    pub fn search<S: AsRef<str>>(&self, segments: &[S], params: &mut PathParams) -> Option<NodeId> {
        let mut current = Self::ROOT;

        for (index, raw) in segments.iter().enumerate() {
            let raw = raw.as_ref();
            let node = &self.nodes[current];

            if let Some(&child) = node.statics.get(raw) {
                current = child;
                continue;
            }

            let decoded = url_decode(raw);
            if decoded != raw {
                if let Some(&child) = node.statics.get(&decoded) {
                    current = child;
                    continue;
                }
            }

            if raw.is_empty() {
                return None;
            }

            if let Some((name, child)) = &node.param {
                params.insert(name.clone(), decoded);
                current = *child;
                continue;
            }

            if let Some((name, child)) = &node.wildcard {
                let rest: Vec<String> =
                    segments[index..].iter().map(|s| url_decode(s.as_ref())).collect();
                params.insert(name.clone(), rest.join("/"));
                return Some(*child);
            }

            return None;
        }

        Some(current)
    }

    /// Attach a value to a node, replacing any previous one
    pub fn set(&mut self, node: NodeId, value: T) -> Option<T> {
        self.nodes.get_mut(node).and_then(|n| n.value.replace(value))
    }

    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.nodes.get(node).and_then(|n| n.value.as_ref())
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing but the root exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}

impl<T> Default for Trie<T> {
    fn default() -> Self {
        Self::new()
    }
}
