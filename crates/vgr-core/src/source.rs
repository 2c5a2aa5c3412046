//! Serde interchange form of a document.
//!
//! `DocumentSource` is a nested, self-describing tree that round-trips
//! through JSON or MessagePack and converts into the graph-backed
//! [`Document`]. It carries already-structured elements; no SVG syntax is
//! parsed here.
//!
//! ```json
//! {
//!   "width": 100, "height": 100,
//!   "gradients": { "sky": { "type": "linear", "start": {"x":0,"y":0},
//!                           "end": {"x":0,"y":1}, "stops": [] } },
//!   "root": { "type": "group", "children": [
//!     { "type": "circle", "center": {"x":50,"y":50}, "radius": 10,
//!       "style": { "fill": { "server": "sky" } } }
//!   ] }
//! }
//! ```

use crate::document::Document;
use crate::error::DocumentError;
use crate::id::NodeId;
use crate::model::{Gradient, Node, NodeKind, Style};
use kurbo::{Affine, Size};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSource {
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub gradients: HashMap<NodeId, Gradient>,
    pub root: ElementSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Style::is_empty")]
    pub style: Style,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Affine>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSource>,
}

impl Document {
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let source: DocumentSource = serde_json::from_str(json)?;
        Self::from_source(source)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, DocumentError> {
        let source: DocumentSource = rmp_serde::from_slice(bytes)?;
        Self::from_source(source)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(&self.to_source())?)
    }

    /// MessagePack with named fields, so optional attributes may be omitted.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(rmp_serde::to_vec_named(&self.to_source())?)
    }

    /// Build and validate a document from its interchange form.
    pub fn from_source(source: DocumentSource) -> Result<Self, DocumentError> {
        let DocumentSource {
            width,
            height,
            gradients,
            root,
        } = source;

        let root_id = root.id.unwrap_or_else(|| NodeId::intern("root"));
        if !root.kind.is_group() {
            return Err(DocumentError::RootNotGroup(root_id));
        }
        validate_style(root_id, &root.style)?;

        let mut root_node = Node::group().with_style(root.style);
        root_node.id = root_id;
        root_node.transform = root.transform;

        let mut doc = Document::with_root(root_node, Size::new(width, height));
        doc.gradients = gradients;

        let root_idx = doc.root;
        for child in root.children {
            insert_element(&mut doc, root_idx, child)?;
        }

        log::debug!(
            "loaded document {}x{}: {} nodes, {} gradients",
            width,
            height,
            doc.len(),
            doc.gradients.len()
        );
        Ok(doc)
    }

    /// Convert back to the nested interchange form.
    pub fn to_source(&self) -> DocumentSource {
        DocumentSource {
            width: self.size.width,
            height: self.size.height,
            gradients: self.gradients.clone(),
            root: self.element_source(self.root),
        }
    }

    fn element_source(&self, idx: NodeIndex) -> ElementSource {
        let node = &self.graph[idx];
        ElementSource {
            id: (!node.id.is_generated()).then_some(node.id),
            kind: node.kind.clone(),
            style: node.style,
            transform: node.transform,
            children: self
                .children(idx)
                .into_iter()
                .map(|c| self.element_source(c))
                .collect(),
        }
    }
}

fn insert_element(
    doc: &mut Document,
    parent: NodeIndex,
    element: ElementSource,
) -> Result<(), DocumentError> {
    let ElementSource {
        id,
        kind,
        style,
        transform,
        children,
    } = element;

    let id = match id {
        Some(id) if doc.id_index.contains_key(&id) => return Err(DocumentError::DuplicateId(id)),
        Some(id) => id,
        None => NodeId::generated(kind.name()),
    };

    if !children.is_empty() && !kind.is_group() {
        return Err(DocumentError::ChildrenOnShape {
            id,
            kind: kind.name(),
        });
    }
    validate_geometry(id, &kind)?;
    validate_style(id, &style)?;

    let idx = doc.add_node(
        parent,
        Node {
            id,
            kind,
            style,
            transform,
        },
    );
    for child in children {
        insert_element(doc, idx, child)?;
    }
    Ok(())
}

fn invalid(id: NodeId, attribute: &'static str, value: f64) -> DocumentError {
    DocumentError::InvalidValue {
        id,
        attribute,
        value,
    }
}

fn non_negative(id: NodeId, attribute: &'static str, value: f64) -> Result<(), DocumentError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(id, attribute, value))
    }
}

fn validate_geometry(id: NodeId, kind: &NodeKind) -> Result<(), DocumentError> {
    match kind {
        NodeKind::Circle { radius, .. } => non_negative(id, "r", *radius),
        NodeKind::Ellipse { radii, .. } => {
            non_negative(id, "rx", radii.x)?;
            non_negative(id, "ry", radii.y)
        }
        NodeKind::Rect { rect, radius } => {
            non_negative(id, "width", rect.width())?;
            non_negative(id, "height", rect.height())?;
            non_negative(id, "rx", *radius)
        }
        _ => Ok(()),
    }
}

/// Opacities outside 0..1 are clamped at render time, not rejected here.
fn validate_style(id: NodeId, style: &Style) -> Result<(), DocumentError> {
    if let Some(w) = style.stroke_width {
        non_negative(id, "stroke-width", w as f64)?;
    }
    if let Some(m) = style.miter_limit
        && !(m.is_finite() && m >= 1.0)
    {
        return Err(invalid(id, "stroke-miterlimit", m as f64));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Color, Paint};

    const NESTED: &str = r##"{
        "width": 64, "height": 32,
        "root": {
            "type": "group",
            "style": { "fill": { "color": "#FF0000" } },
            "children": [
                { "type": "group", "id": "inner", "transform": [1, 0, 0, 1, 5, 5],
                  "children": [
                    { "type": "line", "start": {"x": 0, "y": 0}, "end": {"x": 4, "y": 0} }
                  ] },
                { "type": "rect", "rect": {"x0": 0, "y0": 0, "x1": 8, "y1": 8} }
            ]
        }
    }"##;

    #[test]
    fn nested_json_builds_tree() {
        let doc = Document::from_json(NESTED).unwrap();
        assert_eq!(doc.size, Size::new(64.0, 32.0));
        assert_eq!(doc.len(), 4);

        let root = doc.node(doc.root).unwrap();
        assert_eq!(root.style.fill, Some(Paint::Color(Color::rgba8(255, 0, 0, 255))));

        let inner_idx = doc.index_of(NodeId::intern("inner")).unwrap();
        let inner = doc.node(inner_idx).unwrap();
        assert_eq!(inner.transform, Some(Affine::translate((5.0, 5.0))));
        assert_eq!(doc.children(inner_idx).len(), 1);
    }

    #[test]
    fn rejects_children_on_shapes() {
        let json = r#"{ "width": 1, "height": 1, "root": { "type": "group", "children": [
            { "type": "circle", "id": "c", "center": {"x":0,"y":0}, "radius": 1,
              "children": [ { "type": "group" } ] } ] } }"#;
        let err = Document::from_json(json).unwrap_err();
        assert!(matches!(err, DocumentError::ChildrenOnShape { kind: "circle", .. }));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"{ "width": 1, "height": 1, "root": { "type": "group", "children": [
            { "type": "group", "id": "twin" }, { "type": "group", "id": "twin" } ] } }"#;
        let err = Document::from_json(json).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateId(id) if id.as_str() == "twin"));
    }

    #[test]
    fn rejects_negative_radius() {
        let json = r#"{ "width": 1, "height": 1, "root": { "type": "group", "children": [
            { "type": "circle", "center": {"x":0,"y":0}, "radius": -2 } ] } }"#;
        let err = Document::from_json(json).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidValue { attribute: "r", .. }));
    }

    #[test]
    fn rejects_non_group_root() {
        let json = r#"{ "width": 1, "height": 1,
            "root": { "type": "line", "start": {"x":0,"y":0}, "end": {"x":1,"y":1} } }"#;
        assert!(matches!(
            Document::from_json(json),
            Err(DocumentError::RootNotGroup(_))
        ));
    }

    #[test]
    fn source_omits_generated_ids() {
        let doc = Document::from_json(NESTED).unwrap();
        let source = doc.to_source();
        assert_eq!(source.root.children.len(), 2);
        assert_eq!(source.root.children[0].id, Some(NodeId::intern("inner")));
        assert_eq!(source.root.children[1].id, None);
    }
}
