//! Read-only traversal over a [`SyntaxTree`].
//!
//! Everything here is a pure function of the tree. Functions that expect a
//! property return `None` (or an empty slice) when handed any other node.

use std::slice;

use crate::node::{NodeId, NodeKind, SyntaxTree};

/// Structural children of a node.
///
/// Objects yield their properties and arrays their items. A property yields
/// its value only when that value is itself a collection, so scalar keys and
/// values are never visited.
pub fn children(tree: &SyntaxTree, id: NodeId) -> &[NodeId] {
    match tree.kind(id) {
        NodeKind::Object { properties } => properties,
        NodeKind::Array { items } => items,
        NodeKind::Property { value, .. } if tree.kind(*value).is_collection() => {
            slice::from_ref(value)
        }
        _ => &[],
    }
}

/// Pre-order iterator over everything below a node.
pub struct Descendants<'t> {
    tree: &'t SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(children(self.tree, id).iter().rev().copied());
        Some(id)
    }
}

/// All nodes reachable through [`children`], in document order, excluding
/// `id` itself.
pub fn descendants(tree: &SyntaxTree, id: NodeId) -> Descendants<'_> {
    Descendants {
        tree,
        stack: children(tree, id).iter().rev().copied().collect(),
    }
}

/// A leaf is a property whose value is a scalar.
pub fn is_leaf(tree: &SyntaxTree, id: NodeId) -> bool {
    match tree.kind(id) {
        NodeKind::Property { value, .. } => tree.kind(*value).is_literal(),
        _ => false,
    }
}

/// Every leaf of every root, in document order.
pub fn leaves(tree: &SyntaxTree) -> Vec<NodeId> {
    tree.roots()
        .iter()
        .flat_map(|root| descendants(tree, *root))
        .filter(|id| is_leaf(tree, *id))
        .collect()
}

/// Key text of a property.
pub fn key(tree: &SyntaxTree, id: NodeId) -> Option<&str> {
    match tree.kind(id) {
        NodeKind::Property { key, .. } => tree.kind(*key).text(),
        _ => None,
    }
}

/// Value node of a property.
pub fn value_node(tree: &SyntaxTree, id: NodeId) -> Option<NodeId> {
    match tree.kind(id) {
        NodeKind::Property { value, .. } => Some(*value),
        _ => None,
    }
}

/// Interpreted text of a leaf's value.
pub fn value_text(tree: &SyntaxTree, id: NodeId) -> Option<&str> {
    let value = value_node(tree, id)?;
    match tree.kind(value) {
        NodeKind::Literal { text, .. } => Some(text),
        _ => None,
    }
}

/// Key of the property that owns the collection `id` lives in.
///
/// Array levels are transparent: for `ownerReferences: [{name: x}]` the
/// parent key of `name` is `ownerReferences`.
pub fn parent_key(tree: &SyntaxTree, id: NodeId) -> Option<&str> {
    let mut child = tree.parent(id)?;
    loop {
        let parent = tree.parent(child)?;
        match tree.kind(parent) {
            NodeKind::Property { value, .. } if *value == child => return key(tree, parent),
            NodeKind::Array { .. } | NodeKind::Object { .. } => child = parent,
            _ => return None,
        }
    }
}

/// Properties of the object containing `id`, `id` included.
pub fn siblings(tree: &SyntaxTree, id: NodeId) -> &[NodeId] {
    match tree.parent(id).map(|parent| tree.kind(parent)) {
        Some(NodeKind::Object { properties }) => properties,
        _ => &[],
    }
}

/// Value text of the sibling property named `name`.
pub fn sibling<'t>(tree: &'t SyntaxTree, id: NodeId, name: &str) -> Option<&'t str> {
    siblings(tree, id)
        .iter()
        .find(|prop| key(tree, **prop) == Some(name))
        .and_then(|prop| value_text(tree, *prop))
}

/// Value node of the property `name` of an object.
pub fn property_value(tree: &SyntaxTree, object: NodeId, name: &str) -> Option<NodeId> {
    let NodeKind::Object { properties } = tree.kind(object) else {
        return None;
    };
    properties
        .iter()
        .find(|prop| key(tree, **prop) == Some(name))
        .and_then(|prop| value_node(tree, *prop))
}

/// Strict ancestors of a node, nearest first.
pub fn ancestors(tree: &SyntaxTree, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(tree.parent(id), |id| tree.parent(*id))
}

/// Namespace from the nearest enclosing `metadata` block.
///
/// An ancestor object matches either when it is itself the value of a
/// `metadata` property, or when it has a `metadata` object of its own. The
/// first match with a non-empty `namespace` wins.
pub fn find_namespace(tree: &SyntaxTree, id: NodeId) -> Option<&str> {
    ancestors(tree, id)
        .filter(|ancestor| matches!(tree.kind(*ancestor), NodeKind::Object { .. }))
        .find_map(|object| {
            let is_metadata = tree
                .parent(object)
                .is_some_and(|prop| key(tree, prop) == Some("metadata"));
            let metadata = if is_metadata {
                object
            } else {
                property_value(tree, object, "metadata")?
            };
            let namespace = property_value(tree, metadata, "namespace")?;
            tree.kind(namespace).text().filter(|text| !text.is_empty())
        })
}
