//! A display-list canvas.
//!
//! `RecordingCanvas` keeps every call it receives as a [`CanvasOp`], and for
//! each `fill`/`stroke` a [`DrawCall`] snapshot of the device-space path and
//! the render state it was executed with. It draws nothing; it is the
//! inspection backend for tests and debugging tools.

use crate::canvas::{Canvas, CanvasPaint, Winding};
use crate::path::DevicePath;
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Size};
use vgr_core::{Color, FillRule, LineCap, LineJoin};

/// One recorded canvas call, with arguments as passed.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasOp {
    BeginFrame { size: Size, pixel_ratio: f32 },
    EndFrame,
    Save,
    Restore,
    Reset,
    SetTransform(Affine),
    Transform(Affine),
    ResetTransform,
    FillColor(Color),
    FillPaint(CanvasPaint),
    StrokeColor(Color),
    StrokePaint(CanvasPaint),
    StrokeWidth(f32),
    MiterLimit(f32),
    LineCap(LineCap),
    LineJoin(LineJoin),
    FillRule(FillRule),
    Scissor(Rect),
    ResetScissor,
    BeginPath,
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    BezierTo(Point, Point, Point),
    ArcTo(Point, Point, f64),
    ClosePath,
    PathWinding(Winding),
    Fill,
    Stroke,
}

impl CanvasOp {
    /// Path construction or execution, as opposed to state changes.
    pub fn is_path_op(&self) -> bool {
        matches!(
            self,
            CanvasOp::BeginPath
                | CanvasOp::MoveTo(_)
                | CanvasOp::LineTo(_)
                | CanvasOp::QuadTo(..)
                | CanvasOp::BezierTo(..)
                | CanvasOp::ArcTo(..)
                | CanvasOp::ClosePath
                | CanvasOp::PathWinding(_)
                | CanvasOp::Fill
                | CanvasOp::Stroke
        )
    }
}

/// Paint active for a draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordedPaint {
    Color(Color),
    /// A gradient; its transform already includes the canvas transform at
    /// the time the paint was set.
    Gradient(CanvasPaint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Fill,
    Stroke,
}

/// Snapshot taken at each `fill` / `stroke`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub kind: DrawKind,
    /// Path in device space.
    pub path: BezPath,
    pub paint: RecordedPaint,
    pub stroke_width: f32,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f32,
    pub fill_rule: FillRule,
    /// Canvas transform at execution time.
    pub transform: Affine,
    /// Scissor rectangle and the transform it was set under.
    pub scissor: Option<(Rect, Affine)>,
}

impl DrawCall {
    /// Number of drawing segments (everything except `MoveTo` / `ClosePath`).
    pub fn segment_count(&self) -> usize {
        self.path
            .elements()
            .iter()
            .filter(|el| !matches!(el, PathEl::MoveTo(_) | PathEl::ClosePath))
            .count()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.path.elements().last(), Some(PathEl::ClosePath))
    }

    pub fn color(&self) -> Option<Color> {
        match self.paint {
            RecordedPaint::Color(c) => Some(c),
            RecordedPaint::Gradient(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct State {
    transform: Affine,
    fill: RecordedPaint,
    stroke: RecordedPaint,
    stroke_width: f32,
    miter_limit: f32,
    line_cap: LineCap,
    line_join: LineJoin,
    fill_rule: FillRule,
    scissor: Option<(Rect, Affine)>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: RecordedPaint::Color(Color::WHITE),
            stroke: RecordedPaint::Color(Color::BLACK),
            stroke_width: 1.0,
            miter_limit: 10.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            fill_rule: FillRule::NonZero,
            scissor: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingCanvas {
    ops: Vec<CanvasOp>,
    draws: Vec<DrawCall>,
    state: State,
    saved: Vec<State>,
    path: DevicePath,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[CanvasOp] {
        &self.ops
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Draw calls of one kind, in execution order.
    pub fn draws_of(&self, kind: DrawKind) -> impl Iterator<Item = &DrawCall> {
        self.draws.iter().filter(move |d| d.kind == kind)
    }

    pub fn count(&self, pred: impl Fn(&CanvasOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    /// Number of states pushed by `save` and not yet restored.
    pub fn save_depth(&self) -> usize {
        self.saved.len()
    }

    /// Drop the recording but keep the current state.
    pub fn clear(&mut self) {
        self.ops.clear();
        self.draws.clear();
    }

    fn record(&mut self, op: CanvasOp) {
        log::trace!("canvas: {op:?}");
        self.ops.push(op);
    }

    fn snapshot(&mut self, kind: DrawKind) {
        let s = &self.state;
        self.draws.push(DrawCall {
            kind,
            path: self.path.path().clone(),
            paint: match kind {
                DrawKind::Fill => s.fill,
                DrawKind::Stroke => s.stroke,
            },
            stroke_width: s.stroke_width,
            line_cap: s.line_cap,
            line_join: s.line_join,
            miter_limit: s.miter_limit,
            fill_rule: s.fill_rule,
            transform: s.transform,
            scissor: s.scissor,
        });
    }

    fn gradient(&self, paint: CanvasPaint) -> RecordedPaint {
        RecordedPaint::Gradient(paint.with_transform(self.state.transform * paint.transform))
    }
}

impl Canvas for RecordingCanvas {
    fn begin_frame(&mut self, size: Size, pixel_ratio: f32) {
        self.record(CanvasOp::BeginFrame { size, pixel_ratio });
        self.saved.clear();
        self.state = State::default();
        self.path.clear();
    }

    fn end_frame(&mut self) {
        self.record(CanvasOp::EndFrame);
    }

    fn save(&mut self) {
        self.record(CanvasOp::Save);
        self.saved.push(self.state);
    }

    fn restore(&mut self) {
        self.record(CanvasOp::Restore);
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
    }

    fn reset(&mut self) {
        self.record(CanvasOp::Reset);
        self.state = State::default();
    }

    fn fill_color(&mut self, color: Color) {
        self.record(CanvasOp::FillColor(color));
        self.state.fill = RecordedPaint::Color(color);
    }

    fn fill_paint(&mut self, paint: CanvasPaint) {
        self.record(CanvasOp::FillPaint(paint));
        self.state.fill = self.gradient(paint);
    }

    fn stroke_color(&mut self, color: Color) {
        self.record(CanvasOp::StrokeColor(color));
        self.state.stroke = RecordedPaint::Color(color);
    }

    fn stroke_paint(&mut self, paint: CanvasPaint) {
        self.record(CanvasOp::StrokePaint(paint));
        self.state.stroke = self.gradient(paint);
    }

    fn stroke_width(&mut self, width: f32) {
        self.record(CanvasOp::StrokeWidth(width));
        self.state.stroke_width = width;
    }

    fn miter_limit(&mut self, limit: f32) {
        self.record(CanvasOp::MiterLimit(limit));
        self.state.miter_limit = limit;
    }

    fn line_cap(&mut self, cap: LineCap) {
        self.record(CanvasOp::LineCap(cap));
        self.state.line_cap = cap;
    }

    fn line_join(&mut self, join: LineJoin) {
        self.record(CanvasOp::LineJoin(join));
        self.state.line_join = join;
    }

    fn fill_rule(&mut self, rule: FillRule) {
        self.record(CanvasOp::FillRule(rule));
        self.state.fill_rule = rule;
    }

    fn set_transform(&mut self, transform: Affine) {
        self.record(CanvasOp::SetTransform(transform));
        self.state.transform = transform;
    }

    fn transform(&mut self, transform: Affine) {
        self.record(CanvasOp::Transform(transform));
        self.state.transform = self.state.transform * transform;
    }

    fn reset_transform(&mut self) {
        self.record(CanvasOp::ResetTransform);
        self.state.transform = Affine::IDENTITY;
    }

    fn current_transform(&self) -> Affine {
        self.state.transform
    }

    fn scissor(&mut self, rect: Rect) {
        self.record(CanvasOp::Scissor(rect));
        self.state.scissor = Some((rect, self.state.transform));
    }

    fn reset_scissor(&mut self) {
        self.record(CanvasOp::ResetScissor);
        self.state.scissor = None;
    }

    fn begin_path(&mut self) {
        self.record(CanvasOp::BeginPath);
        self.path.clear();
    }

    fn move_to(&mut self, p: Point) {
        self.record(CanvasOp::MoveTo(p));
        self.path.move_to(self.state.transform, p);
    }

    fn line_to(&mut self, p: Point) {
        self.record(CanvasOp::LineTo(p));
        self.path.line_to(self.state.transform, p);
    }

    fn quad_to(&mut self, ctrl: Point, p: Point) {
        self.record(CanvasOp::QuadTo(ctrl, p));
        self.path.quad_to(self.state.transform, ctrl, p);
    }

    fn bezier_to(&mut self, c1: Point, c2: Point, p: Point) {
        self.record(CanvasOp::BezierTo(c1, c2, p));
        self.path.bezier_to(self.state.transform, c1, c2, p);
    }

    fn arc_to(&mut self, p1: Point, p2: Point, radius: f64) {
        self.record(CanvasOp::ArcTo(p1, p2, radius));
        self.path.arc_to(self.state.transform, p1, p2, radius);
    }

    fn close_path(&mut self) {
        self.record(CanvasOp::ClosePath);
        self.path.close();
    }

    fn path_winding(&mut self, winding: Winding) {
        self.record(CanvasOp::PathWinding(winding));
    }

    fn fill(&mut self) {
        self.record(CanvasOp::Fill);
        self.snapshot(DrawKind::Fill);
    }

    fn stroke(&mut self) {
        self.record(CanvasOp::Stroke);
        self.snapshot(DrawKind::Stroke);
    }
}
