//! Unified node model shared by the YAML and JSON adapters.

use kube_source_map::TextRange;

/// Index of a node inside a [`SyntaxTree`].
///
/// Ids are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of node shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A mapping; children are `Property` nodes in source order.
    Object { properties: Vec<NodeId> },

    /// A sequence of arbitrary nodes.
    Array { items: Vec<NodeId> },

    /// One `key: value` entry of an object.
    Property { key: NodeId, value: NodeId },

    /// The key of a property.
    Key { raw: String, text: String },

    /// A scalar value. Nulls, written or implicit, have empty `text`.
    Literal { raw: String, text: String },
}

impl NodeKind {
    pub fn is_collection(&self) -> bool {
        matches!(self, NodeKind::Object { .. } | NodeKind::Array { .. })
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, NodeKind::Literal { .. })
    }

    /// Interpreted text of a key or literal.
    pub fn text(&self) -> Option<&str> {
        match self {
            NodeKind::Key { text, .. } | NodeKind::Literal { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Text as written in the source, quotes included.
    pub fn raw(&self) -> Option<&str> {
        match self {
            NodeKind::Key { raw, .. } | NodeKind::Literal { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: TextRange,
}

/// Arena holding every node of one parsed snapshot.
///
/// Nodes are owned top-down by the arena. The parent relation is a separate
/// table, so walking upwards never keeps anything alive and there are no
/// reference cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    parents: Vec<Option<NodeId>>,
    roots: Vec<NodeId>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level nodes, one per manifest in the source.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.node(id).range
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node id in allocation order (children before their parents).
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Allocate a node and claim its children.
    ///
    /// Children must already be allocated and still unparented, so trees are
    /// always built bottom-up.
    pub(crate) fn alloc(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        match &kind {
            NodeKind::Object { properties: children } | NodeKind::Array { items: children } => {
                for child in children {
                    self.parents[child.index()] = Some(id);
                }
            }
            NodeKind::Property { key, value } => {
                self.parents[key.index()] = Some(id);
                self.parents[value.index()] = Some(id);
            }
            NodeKind::Key { .. } | NodeKind::Literal { .. } => {}
        }
        self.nodes.push(Node { kind, range });
        self.parents.push(None);
        id
    }

    pub(crate) fn push_root(&mut self, id: NodeId) {
        self.roots.push(id);
    }

    /// Patch the extent of a scalar whose end is only known later.
    pub(crate) fn set_scalar_extent(&mut self, id: NodeId, range: TextRange, source: &str) {
        let node = &mut self.nodes[id.index()];
        node.range = range;
        if let NodeKind::Key { raw, .. } | NodeKind::Literal { raw, .. } = &mut node.kind {
            *raw = range.slice(source).unwrap_or_default().to_string();
        }
    }
}
