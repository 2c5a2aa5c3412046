//! Document tree → canvas calls.
//!
//! `SvgRenderer` walks a [`Document`] depth-first. Entering a node pushes
//! the attributes its style overrides and its local transform onto the
//! [`AttributeStacks`]; shapes are then filled and stroked with the
//! effective values, groups recurse into their children, and leaving the
//! node pops exactly what was pushed.
//!
//! ```no_run
//! # use vgr_core::Document;
//! # use vgr_render::{Canvas, RecordingCanvas, SvgRenderer};
//! # fn frame(doc: &Document, canvas: &mut RecordingCanvas, size: kurbo::Size) {
//! canvas.begin_frame(size, 1.0);
//! SvgRenderer::new(canvas).render(doc);
//! canvas.end_frame();
//! # }
//! ```

use crate::canvas::Canvas;
use crate::paint::{self, ResolvedPaint};
use crate::shape;
use crate::stacks::{AttributeStacks, StackDepths};
use kurbo::Affine;
use serde::{Deserialize, Serialize};
use vgr_core::{
    DEFAULT_TOLERANCE, Document, FillRule, LineCap, LineJoin, Node, NodeIndex, Paint, Style,
    sanitize_tolerance,
};

/// Renderer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Miter limit used when no node overrides it.
    pub miter_limit: f32,
    /// Maximum error when elliptical arcs are approximated by cubics.
    pub tolerance: f64,
    /// Log image and text nodes that are visited but not drawn.
    pub log_skipped: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            miter_limit: 4.0,
            tolerance: DEFAULT_TOLERANCE,
            log_skipped: true,
        }
    }
}

pub struct SvgRenderer<'a, C: Canvas + ?Sized> {
    canvas: &'a mut C,
    stacks: AttributeStacks,
    options: RenderOptions,
    /// Canvas transform the document transform stack composes onto.
    baseline: Affine,
}

impl<'a, C: Canvas + ?Sized> SvgRenderer<'a, C> {
    pub fn new(canvas: &'a mut C) -> Self {
        Self::with_stacks(canvas, AttributeStacks::new())
    }

    /// Reuse stack storage from a previous renderer.
    pub fn with_stacks(canvas: &'a mut C, stacks: AttributeStacks) -> Self {
        let baseline = canvas.current_transform();
        Self {
            canvas,
            stacks,
            options: RenderOptions::default(),
            baseline,
        }
    }

    /// Replace the options. An unusable arc tolerance falls back to the
    /// default.
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = RenderOptions {
            tolerance: sanitize_tolerance(options.tolerance),
            ..options
        };
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Give the stack storage back for the next frame.
    pub fn into_stacks(self) -> AttributeStacks {
        self.stacks
    }

    pub fn canvas(&mut self) -> &mut C {
        &mut *self.canvas
    }

    pub fn stacks(&self) -> &AttributeStacks {
        &self.stacks
    }

    pub fn depths(&self) -> StackDepths {
        self.stacks.depths()
    }

    /// Draw the whole document, starting at its root group.
    pub fn render(&mut self, doc: &Document) {
        let before = self.stacks.depths();
        if before.transform == 0 {
            self.baseline = self.canvas.current_transform();
        }
        log::trace!("render: {} nodes, baseline {:?}", doc.len(), self.baseline);

        self.render_node(doc, doc.root);

        debug_assert_eq!(self.stacks.depths(), before, "unbalanced attribute stacks");
    }

    /// Draw the subtree rooted at `idx`. Inherited attributes come from
    /// whatever is on the stacks already.
    pub fn render_node(&mut self, doc: &Document, idx: NodeIndex) {
        let Some(node) = doc.node(idx) else {
            log::debug!("render: no node at {idx:?}");
            return;
        };
        log::trace!("visit {} ({})", node.id, node.kind.name());

        self.push_style(&node.style);
        if let Some(m) = node.transform {
            self.push_transform(m);
        }

        if node.kind.is_group() {
            for child in doc.children(idx) {
                self.render_node(doc, child);
            }
        } else if node.kind.is_shape() {
            self.fill_and_stroke(doc, node);
        } else if self.options.log_skipped {
            log::debug!("skipping {} {}: not drawn", node.kind.name(), node.id);
        }

        if node.transform.is_some() {
            self.pop_transform();
        }
        self.pop_style(&node.style);
    }

    // ─── Transform ───────────────────────────────────────────────────────

    pub fn push_transform(&mut self, m: Affine) {
        self.stacks.push_transform(m);
        self.apply_transform();
    }

    pub fn pop_transform(&mut self) {
        self.stacks.pop_transform();
        self.apply_transform();
    }

    fn apply_transform(&mut self) {
        self.canvas.set_transform(self.baseline * self.stacks.transform());
    }

    // ─── Paint and stroke attributes ─────────────────────────────────────

    pub fn push_fill(&mut self, paint: Paint) {
        self.stacks.push_fill(paint);
    }

    pub fn pop_fill(&mut self) {
        self.stacks.pop_fill();
    }

    pub fn push_stroke(&mut self, paint: Paint) {
        self.stacks.push_stroke(paint);
    }

    pub fn pop_stroke(&mut self) {
        self.stacks.pop_stroke();
    }

    pub fn push_fill_opacity(&mut self, v: f32) {
        self.stacks.push_fill_opacity(v);
    }

    pub fn pop_fill_opacity(&mut self) {
        self.stacks.pop_fill_opacity();
    }

    pub fn push_stroke_opacity(&mut self, v: f32) {
        self.stacks.push_stroke_opacity(v);
    }

    pub fn pop_stroke_opacity(&mut self) {
        self.stacks.pop_stroke_opacity();
    }

    pub fn push_stroke_width(&mut self, width: f32) {
        self.stacks.push_stroke_width(width);
    }

    pub fn pop_stroke_width(&mut self) {
        self.stacks.pop_stroke_width();
    }

    pub fn push_line_cap(&mut self, cap: LineCap) {
        self.stacks.push_line_cap(cap);
    }

    pub fn pop_line_cap(&mut self) {
        self.stacks.pop_line_cap();
    }

    pub fn push_line_join(&mut self, join: LineJoin) {
        self.stacks.push_line_join(join);
    }

    pub fn pop_line_join(&mut self) {
        self.stacks.pop_line_join();
    }

    pub fn push_miter_limit(&mut self, limit: f32) {
        self.stacks.push_miter_limit(limit);
    }

    pub fn pop_miter_limit(&mut self) {
        self.stacks.pop_miter_limit();
    }

    pub fn push_fill_rule(&mut self, rule: FillRule) {
        self.stacks.push_fill_rule(rule);
    }

    pub fn pop_fill_rule(&mut self) {
        self.stacks.pop_fill_rule();
    }

    /// Push every attribute `style` overrides. Element opacity multiplies
    /// into both the fill and the stroke opacity push.
    pub fn push_style(&mut self, style: &Style) {
        if let Some(paint) = style.fill {
            self.push_fill(paint);
        }
        if let Some(paint) = style.stroke {
            self.push_stroke(paint);
        }
        if let Some(v) = fill_opacity(style) {
            self.push_fill_opacity(v);
        }
        if let Some(v) = stroke_opacity(style) {
            self.push_stroke_opacity(v);
        }
        if let Some(width) = style.stroke_width {
            self.push_stroke_width(width);
        }
        if let Some(cap) = style.line_cap {
            self.push_line_cap(cap);
        }
        if let Some(join) = style.line_join {
            self.push_line_join(join);
        }
        if let Some(limit) = style.miter_limit {
            self.push_miter_limit(limit);
        }
        if let Some(rule) = style.fill_rule {
            self.push_fill_rule(rule);
        }
    }

    /// Undo [`push_style`](Self::push_style) for the same style.
    pub fn pop_style(&mut self, style: &Style) {
        if style.fill_rule.is_some() {
            self.pop_fill_rule();
        }
        if style.miter_limit.is_some() {
            self.pop_miter_limit();
        }
        if style.line_join.is_some() {
            self.pop_line_join();
        }
        if style.line_cap.is_some() {
            self.pop_line_cap();
        }
        if style.stroke_width.is_some() {
            self.pop_stroke_width();
        }
        if stroke_opacity(style).is_some() {
            self.pop_stroke_opacity();
        }
        if fill_opacity(style).is_some() {
            self.pop_fill_opacity();
        }
        if style.stroke.is_some() {
            self.pop_stroke();
        }
        if style.fill.is_some() {
            self.pop_fill();
        }
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    /// Configure the canvas fill for `node`. False when there is nothing to
    /// fill.
    pub fn prepare_fill(&mut self, doc: &Document, node: &Node) -> bool {
        let paint = self.stacks.fill();
        let opacity = self.stacks.fill_opacity();
        if paint.is_none() || opacity <= 0.0 {
            return false;
        }
        match paint::resolve_paint(&*self.canvas, doc, paint, &node.kind, opacity) {
            Some(ResolvedPaint::Color(color)) => self.canvas.fill_color(color),
            Some(ResolvedPaint::Gradient(p)) => self.canvas.fill_paint(p),
            None => return false,
        }
        self.canvas.fill_rule(self.stacks.fill_rule());
        true
    }

    /// Configure the canvas stroke for `node`. False when there is nothing
    /// to stroke.
    pub fn prepare_stroke(&mut self, doc: &Document, node: &Node) -> bool {
        let paint = self.stacks.stroke();
        let opacity = self.stacks.stroke_opacity();
        let width = self.stacks.stroke_width();
        if paint.is_none() || opacity <= 0.0 || width <= 0.0 {
            return false;
        }
        match paint::resolve_paint(&*self.canvas, doc, paint, &node.kind, opacity) {
            Some(ResolvedPaint::Color(color)) => self.canvas.stroke_color(color),
            Some(ResolvedPaint::Gradient(p)) => self.canvas.stroke_paint(p),
            None => return false,
        }
        self.canvas.stroke_width(width);
        self.canvas.line_cap(self.stacks.line_cap());
        self.canvas.line_join(self.stacks.line_join());
        self.canvas
            .miter_limit(self.stacks.miter_limit(self.options.miter_limit));
        true
    }

    /// Build the node's path once and run fill and/or stroke on it.
    pub fn fill_and_stroke(&mut self, doc: &Document, node: &Node) {
        let fill = self.prepare_fill(doc, node);
        let stroke = self.prepare_stroke(doc, node);
        if !fill && !stroke {
            log::trace!("{}: nothing to paint", node.id);
            return;
        }

        self.canvas.begin_path();
        shape::emit_geometry(&mut *self.canvas, &node.kind, self.options.tolerance);
        if fill {
            self.canvas.fill();
        }
        if stroke {
            self.canvas.stroke();
        }
    }
}

fn fill_opacity(style: &Style) -> Option<f32> {
    combine_opacity(style.fill_opacity, style.opacity)
}

fn stroke_opacity(style: &Style) -> Option<f32> {
    combine_opacity(style.stroke_opacity, style.opacity)
}

fn combine_opacity(own: Option<f32>, element: Option<f32>) -> Option<f32> {
    match (own, element) {
        (None, None) => None,
        (own, element) => {
            let factor = |v: Option<f32>| v.unwrap_or(1.0).clamp(0.0, 1.0);
            Some(factor(own) * factor(element))
        }
    }
}

/// Draw `doc` with default options into the current frame of `canvas`.
pub fn draw_document<C: Canvas + ?Sized>(canvas: &mut C, doc: &Document) {
    SvgRenderer::new(canvas).render(doc);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{CanvasOp, DrawKind, RecordingCanvas};
    use kurbo::{Point, Rect, Size, Vec2};
    use pretty_assertions::assert_eq;
    use vgr_core::{Color, NodeKind};

    fn rect_node() -> Node {
        Node::new(NodeKind::Rect {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            radius: 0.0,
        })
    }

    #[test]
    fn default_fill_is_black_without_stroke() {
        let mut doc = Document::new(Size::new(10.0, 10.0));
        doc.add_node(doc.root, rect_node());

        let mut canvas = RecordingCanvas::new();
        draw_document(&mut canvas, &doc);

        assert_eq!(canvas.draws().len(), 1);
        let draw = &canvas.draws()[0];
        assert_eq!(draw.kind, DrawKind::Fill);
        assert_eq!(draw.color(), Some(Color::BLACK));
    }

    #[test]
    fn fill_then_stroke_share_one_path() {
        let mut doc = Document::new(Size::new(10.0, 10.0));
        doc.add_node(
            doc.root,
            rect_node().with_style(
                Style::default()
                    .stroke(Paint::Color(Color::WHITE))
                    .stroke_width(2.0),
            ),
        );
        let mut canvas = RecordingCanvas::new();
        draw_document(&mut canvas, &doc);

        let ops = canvas.ops();
        assert_eq!(canvas.count(|op| *op == CanvasOp::BeginPath), 1);
        let fill_at = ops.iter().position(|op| *op == CanvasOp::Fill);
        let stroke_at = ops.iter().position(|op| *op == CanvasOp::Stroke);
        assert!(fill_at < stroke_at);
        assert!(ops.contains(&CanvasOp::StrokeWidth(2.0)));
        assert!(ops.contains(&CanvasOp::MiterLimit(4.0)));
    }

    #[test]
    fn zero_stroke_width_disables_stroke() {
        let mut doc = Document::new(Size::new(10.0, 10.0));
        doc.add_node(
            doc.root,
            rect_node().with_style(
                Style::default()
                    .fill(Paint::None)
                    .stroke(Paint::Color(Color::WHITE))
                    .stroke_width(0.0),
            ),
        );
        let mut canvas = RecordingCanvas::new();
        draw_document(&mut canvas, &doc);
        assert_eq!(canvas.count(CanvasOp::is_path_op), 0);
    }

    #[test]
    fn element_opacity_folds_into_fill_and_stroke() {
        let style = Style::default().opacity(0.5).fill_opacity(0.5);
        assert_eq!(fill_opacity(&style), Some(0.25));
        assert_eq!(stroke_opacity(&style), Some(0.5));
        assert_eq!(fill_opacity(&Style::default()), None);
    }

    #[test]
    fn push_style_and_pop_style_balance() {
        let mut canvas = RecordingCanvas::new();
        let mut renderer = SvgRenderer::new(&mut canvas);
        let style = Style::default()
            .fill(Paint::None)
            .opacity(0.3)
            .line_join(LineJoin::Bevel)
            .fill_rule(FillRule::EvenOdd);
        renderer.push_style(&style);
        let depths = renderer.depths();
        assert_eq!(depths.fill, 1);
        assert_eq!(depths.fill_opacity, 1);
        assert_eq!(depths.stroke_opacity, 1);
        assert_eq!(depths.stroke, 0);
        renderer.pop_style(&style);
        assert!(renderer.depths().is_empty());
    }

    #[test]
    fn render_composes_onto_canvas_transform() {
        let mut doc = Document::new(Size::new(10.0, 10.0));
        doc.add_node(
            doc.root,
            Node::new(NodeKind::Line {
                start: Point::ZERO,
                end: Point::new(1.0, 0.0),
            })
            .with_transform(Affine::scale(3.0))
            .with_style(Style::default().stroke(Paint::Color(Color::BLACK))),
        );

        let mut canvas = RecordingCanvas::new();
        canvas.translate(Vec2::new(100.0, 0.0));
        draw_document(&mut canvas, &doc);

        let stroke = canvas.draws_of(DrawKind::Stroke).next().unwrap();
        assert_eq!(
            stroke.path.elements().last(),
            Some(&kurbo::PathEl::LineTo(Point::new(103.0, 0.0)))
        );
        // Popping the node transform returns to the baseline.
        assert_eq!(canvas.current_transform(), Affine::translate((100.0, 0.0)));
    }

    #[test]
    fn image_and_text_are_visited_but_not_drawn() {
        let mut doc = Document::new(Size::new(10.0, 10.0));
        doc.add_node(
            doc.root,
            Node::new(NodeKind::TextSpan {
                text: "hi".into(),
                position: Point::ZERO,
            })
            .with_transform(Affine::scale(2.0)),
        );
        doc.add_node(
            doc.root,
            Node::new(NodeKind::Image {
                href: "a.png".into(),
                rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            }),
        );
        let mut canvas = RecordingCanvas::new();
        let mut renderer = SvgRenderer::new(&mut canvas);
        renderer.render(&doc);
        assert!(renderer.depths().is_empty());
        assert_eq!(canvas.count(CanvasOp::is_path_op), 0);
    }
}
