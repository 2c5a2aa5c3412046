//! The document tree.
//!
//! A `Document` is a tree of [`Node`] values stored in a petgraph
//! `StableDiGraph`, edges pointing parent → child. The root is always a
//! group. Gradients live beside the tree in a table keyed by id, the way
//! `<defs>` sit outside the rendered content.

use crate::id::NodeId;
use crate::model::{Gradient, Node, NodeKind};
use kurbo::Size;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Document {
    /// The underlying tree.
    pub graph: StableDiGraph<Node, ()>,

    /// Root group.
    pub root: NodeIndex,

    /// Intrinsic document size in user units.
    pub size: Size,

    /// Paint servers referenced by `Paint::Server`.
    pub gradients: HashMap<NodeId, Gradient>,

    /// Element id → index.
    pub id_index: HashMap<NodeId, NodeIndex>,
}

impl Document {
    /// An empty document whose root is an anonymous group.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self::with_root(Node::group().with_id("root"), size)
    }

    /// An empty document with the given root node, which must be a group.
    pub fn with_root(root_node: Node, size: Size) -> Self {
        debug_assert!(root_node.kind.is_group(), "document root must be a group");
        let mut graph = StableDiGraph::new();
        let id = root_node.id;
        let root = graph.add_node(root_node);

        let mut id_index = HashMap::new();
        id_index.insert(id, root);

        Self {
            graph,
            root,
            size,
            gradients: HashMap::new(),
            id_index,
        }
    }

    /// Append `node` as the last child of `parent`.
    pub fn add_node(&mut self, parent: NodeIndex, node: Node) -> NodeIndex {
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent, idx, ());
        self.id_index.insert(id, idx);
        idx
    }

    /// Register a paint server under `id`, replacing any previous one.
    pub fn add_gradient(&mut self, id: &str, gradient: Gradient) -> NodeId {
        let id = NodeId::intern(id);
        self.gradients.insert(id, gradient);
        id
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    pub fn get_by_id(&self, id: NodeId) -> Option<&Node> {
        self.id_index.get(&id).and_then(|idx| self.graph.node_weight(*idx))
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn gradient(&self, id: NodeId) -> Option<&Gradient> {
        self.gradients.get(&id)
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    /// Children in document (paint) order.
    ///
    /// Sorted by `NodeIndex`, which for an append-only tree is insertion
    /// order, so the result does not depend on petgraph's adjacency order.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        children.sort();
        children
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() <= 1
    }

    /// Maximum nesting depth below the root (root alone is depth 0).
    ///
    /// Equals the peak depth the renderer's attribute stacks reach.
    pub fn depth(&self) -> usize {
        self.depth_of(self.root)
    }

    fn depth_of(&self, idx: NodeIndex) -> usize {
        self.children(idx)
            .into_iter()
            .map(|c| 1 + self.depth_of(c))
            .max()
            .unwrap_or(0)
    }

    /// Count nodes by kind name, in no particular order.
    pub fn kind_histogram(&self) -> HashMap<&'static str, usize> {
        let mut counts = HashMap::new();
        for node in self.graph.node_weights() {
            *counts.entry(node.kind.name()).or_insert(0) += 1;
        }
        counts
    }

    /// True if `node` is a group (and may therefore have children).
    pub fn is_container(&self, idx: NodeIndex) -> bool {
        self.node(idx)
            .is_some_and(|n| matches!(n.kind, NodeKind::Group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Style;
    use kurbo::Point;

    fn circle(r: f64) -> Node {
        Node::new(NodeKind::Circle {
            center: Point::ZERO,
            radius: r,
        })
    }

    #[test]
    fn children_keep_insertion_order() {
        let mut doc = Document::new(Size::new(100.0, 100.0));
        let a = doc.add_node(doc.root, circle(1.0).with_id("a"));
        let b = doc.add_node(doc.root, circle(2.0).with_id("b"));
        let c = doc.add_node(doc.root, circle(3.0).with_id("c"));
        assert_eq!(doc.children(doc.root), vec![a, b, c]);
        assert_eq!(doc.parent(b), Some(doc.root));
    }

    #[test]
    fn lookup_by_id() {
        let mut doc = Document::new(Size::new(10.0, 10.0));
        doc.add_node(doc.root, circle(4.0).with_id("dot"));
        let node = doc.get_by_id(NodeId::intern("dot")).unwrap();
        assert!(matches!(node.kind, NodeKind::Circle { radius, .. } if radius == 4.0));
        assert!(doc.get_by_id(NodeId::intern("missing")).is_none());
    }

    #[test]
    fn depth_counts_nesting() {
        let mut doc = Document::new(Size::new(10.0, 10.0));
        assert_eq!(doc.depth(), 0);
        let g1 = doc.add_node(doc.root, Node::group().with_style(Style::default().opacity(0.5)));
        let g2 = doc.add_node(g1, Node::group());
        doc.add_node(g2, circle(1.0));
        doc.add_node(doc.root, circle(1.0));
        assert_eq!(doc.depth(), 3);
        assert!(doc.is_container(g2));
    }

    #[test]
    fn kind_histogram_counts_root() {
        let mut doc = Document::new(Size::new(10.0, 10.0));
        doc.add_node(doc.root, circle(1.0));
        doc.add_node(doc.root, circle(2.0));
        let hist = doc.kind_histogram();
        assert_eq!(hist.get("group"), Some(&1));
        assert_eq!(hist.get("circle"), Some(&2));
        assert_eq!(doc.len(), 3);
        assert!(!doc.is_empty());
    }
}
