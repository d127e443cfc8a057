//! JSON-to-tree conversion
//!
//! [`TreeBuilder`] turns a JSON value (usually a sample derived from an
//! OpenAPI or AsyncAPI schema) into a [`TreeNode`] hierarchy in a single
//! bounded pre-order pass. Every node carries the [`KeyChain`] that resolves
//! back to its value.

use crate::keychain::{KeyChain, Segment};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Default traversal depth bound
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Primitive kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl NodeKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => NodeKind::Object,
            Value::Array(_) => NodeKind::Array,
            Value::String(_) => NodeKind::String,
            Value::Number(_) => NodeKind::Number,
            Value::Bool(_) => NodeKind::Boolean,
            Value::Null => NodeKind::Null,
        }
    }

    /// Whether the kind has no children
    pub fn is_primitive(self) -> bool {
        !matches!(self, NodeKind::Object | NodeKind::Array)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Object => "object",
            NodeKind::Array => "array",
            NodeKind::String => "string",
            NodeKind::Number => "number",
            NodeKind::Boolean => "boolean",
            NodeKind::Null => "null",
        };
        f.write_str(name)
    }
}

/// One location in a JSON value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub key_chain: KeyChain,
    pub kind: NodeKind,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Last segment of the chain, `None` for the root
    pub fn key(&self) -> Option<&Segment> {
        self.key_chain.last()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether this node is mapped as a unit
    ///
    /// Primitives are, and so are arrays whose items are all primitives
    /// (including empty arrays). Objects and arrays holding objects are not.
    pub fn is_mappable_leaf(&self) -> bool {
        match self.kind {
            NodeKind::Object => false,
            NodeKind::Array => self.children.iter().all(|c| c.kind.is_primitive()),
            _ => true,
        }
    }

    /// Item kinds of a leaf array, in order and without duplicates
    pub fn item_kinds(&self) -> Vec<NodeKind> {
        let mut kinds = Vec::new();
        for child in &self.children {
            if !kinds.contains(&child.kind) {
                kinds.push(child.kind);
            }
        }
        kinds
    }

    /// Mappable leaves in pre-order; does not descend into leaf arrays
    pub fn mappable_leaves(&self) -> Vec<&TreeNode> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// All nodes in pre-order, including this one
    pub fn walk(&self) -> Vec<&TreeNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }

    /// Find a node by exact chain
    pub fn find(&self, chain: &KeyChain) -> Option<&TreeNode> {
        let mut current = self;
        for segment in chain.skip(self.key_chain.len()) {
            current = current
                .children
                .iter()
                .find(|c| c.key() == Some(segment))?;
        }
        Some(current)
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}

fn collect_leaves<'a>(node: &'a TreeNode, out: &mut Vec<&'a TreeNode>) {
    if !node.key_chain.is_root() && node.is_mappable_leaf() {
        out.push(node);
        return;
    }
    for child in &node.children {
        collect_leaves(child, out);
    }
}

/// Builds [`TreeNode`]s from JSON values
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    max_depth: usize,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the depth bound
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Build a tree rooted at the empty chain
    pub fn build(&self, value: &Value) -> Result<TreeNode> {
        let root = self.build_node(value, KeyChain::root(), 0)?;
        tracing::debug!(nodes = root.node_count(), "Built JSON tree");
        Ok(root)
    }

    /// Parse `text` as JSON and build its tree
    pub fn build_str(&self, text: &str) -> Result<TreeNode> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::MalformedInput {
            message: format!("not a JSON document: {}", e),
        })?;
        self.build(&value)
    }

    /// Build one tree whose top-level members are interface keys
    pub fn build_keyed(&self, bodies: &BTreeMap<String, Value>) -> Result<TreeNode> {
        let wrapped: serde_json::Map<String, Value> = bodies
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.build(&Value::Object(wrapped))
    }

    fn build_node(&self, value: &Value, chain: KeyChain, depth: usize) -> Result<TreeNode> {
        if depth > self.max_depth {
            return Err(Error::DepthExceeded {
                max_depth: self.max_depth,
                path: chain.to_string(),
            });
        }

        let children = match value {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| self.build_node(v, chain.append(k.as_str()), depth + 1))
                .collect::<Result<Vec<_>>>()?,
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| self.build_node(v, chain.append(i), depth + 1))
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        Ok(TreeNode {
            key_chain: chain,
            kind: NodeKind::of(value),
            children,
        })
    }
}
