//! Canvas → Vello scene.
//!
//! Paths are accumulated in device space and encoded into a borrowed
//! `vello::Scene` on each `fill` / `stroke`. The caller owns the scene and
//! presents it via wgpu.

use crate::canvas::{Canvas, CanvasPaint, GradientShape, Winding, average_scale};
use crate::path::DevicePath;
use kurbo::{Affine, Cap, Join, Point, Rect, Size, Stroke};
use peniko::{Brush, Fill, Gradient, Mix};
use vello::Scene;
use vgr_core::{Color, FillRule, LineCap, LineJoin};

#[derive(Debug, Clone, Copy, PartialEq)]
enum CanvasBrush {
    Color(Color),
    /// `to_device` maps the paint geometry into device space.
    Paint { paint: CanvasPaint, to_device: Affine },
}

#[derive(Debug, Clone, Copy)]
struct State {
    transform: Affine,
    fill: CanvasBrush,
    stroke: CanvasBrush,
    stroke_width: f32,
    miter_limit: f32,
    line_cap: LineCap,
    line_join: LineJoin,
    fill_rule: FillRule,
    /// Scissor rectangle and the device transform it was set under.
    scissor: Option<(Rect, Affine)>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: CanvasBrush::Color(Color::WHITE),
            stroke: CanvasBrush::Color(Color::BLACK),
            stroke_width: 1.0,
            miter_limit: 10.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            fill_rule: FillRule::NonZero,
            scissor: None,
        }
    }
}

/// A [`Canvas`] that encodes into a Vello scene.
pub struct VelloCanvas<'s> {
    scene: &'s mut Scene,
    /// Logical → device pixels.
    base: Affine,
    state: State,
    saved: Vec<State>,
    path: DevicePath,
}

impl<'s> VelloCanvas<'s> {
    pub fn new(scene: &'s mut Scene) -> Self {
        Self {
            scene,
            base: Affine::IDENTITY,
            state: State::default(),
            saved: Vec::new(),
            path: DevicePath::default(),
        }
    }

    pub fn scene(&mut self) -> &mut Scene {
        &mut *self.scene
    }

    fn device_transform(&self) -> Affine {
        self.base * self.state.transform
    }

    fn brush(&self, paint: CanvasPaint) -> CanvasBrush {
        CanvasBrush::Paint {
            paint,
            to_device: self.device_transform() * paint.transform,
        }
    }

    /// Run `draw` with the current scissor applied as a clip layer.
    fn clipped(&mut self, draw: impl FnOnce(&mut Scene)) {
        match self.state.scissor {
            Some((rect, xf)) => {
                self.scene.push_layer(Mix::Clip, 1.0, xf, &rect);
                draw(&mut *self.scene);
                self.scene.pop_layer();
            }
            None => draw(&mut *self.scene),
        }
    }
}

fn peniko_color(c: Color) -> peniko::Color {
    peniko::Color::new([c.r, c.g, c.b, c.a])
}

fn to_brush(brush: CanvasBrush) -> (Brush, Option<Affine>) {
    match brush {
        CanvasBrush::Color(c) => (Brush::Solid(peniko_color(c)), None),
        CanvasBrush::Paint { paint, to_device } => {
            let stops = [peniko_color(paint.inner), peniko_color(paint.outer)];
            let gradient = match paint.shape {
                GradientShape::Linear { start, end } => Gradient::new_linear(start, end),
                GradientShape::Radial {
                    center,
                    inner_radius,
                    outer_radius,
                } => Gradient::new_two_point_radial(
                    center,
                    inner_radius as f32,
                    center,
                    outer_radius as f32,
                ),
                // Approximated by a radial ramp across the feather band.
                GradientShape::Box { rect, feather, .. } => {
                    let half = rect.width().min(rect.height()) * 0.5;
                    let feather = feather.max(0.0);
                    Gradient::new_two_point_radial(
                        rect.center(),
                        (half - feather * 0.5).max(0.0) as f32,
                        rect.center(),
                        (half + feather * 0.5) as f32,
                    )
                }
            };
            (Brush::Gradient(gradient.with_stops(stops)), Some(to_device))
        }
    }
}

fn cap(cap: LineCap) -> Cap {
    match cap {
        LineCap::Butt => Cap::Butt,
        LineCap::Round => Cap::Round,
        LineCap::Square => Cap::Square,
    }
}

fn join(join: LineJoin) -> Join {
    match join {
        LineJoin::Miter => Join::Miter,
        LineJoin::Round => Join::Round,
        LineJoin::Bevel => Join::Bevel,
    }
}

impl Canvas for VelloCanvas<'_> {
    fn begin_frame(&mut self, size: Size, pixel_ratio: f32) {
        log::trace!("vello frame {}x{} @{pixel_ratio}", size.width, size.height);
        self.scene.reset();
        self.base = Affine::scale(f64::from(pixel_ratio));
        self.saved.clear();
        self.state = State::default();
        self.path.clear();
    }

    fn end_frame(&mut self) {
        if !self.saved.is_empty() {
            log::debug!("frame ended with {} unrestored states", self.saved.len());
            self.saved.clear();
        }
    }

    fn save(&mut self) {
        self.saved.push(self.state);
    }

    fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
    }

    fn reset(&mut self) {
        self.state = State::default();
    }

    fn fill_color(&mut self, color: Color) {
        self.state.fill = CanvasBrush::Color(color);
    }

    fn fill_paint(&mut self, paint: CanvasPaint) {
        self.state.fill = self.brush(paint);
    }

    fn stroke_color(&mut self, color: Color) {
        self.state.stroke = CanvasBrush::Color(color);
    }

    fn stroke_paint(&mut self, paint: CanvasPaint) {
        self.state.stroke = self.brush(paint);
    }

    fn stroke_width(&mut self, width: f32) {
        self.state.stroke_width = width;
    }

    fn miter_limit(&mut self, limit: f32) {
        self.state.miter_limit = limit;
    }

    fn line_cap(&mut self, cap: LineCap) {
        self.state.line_cap = cap;
    }

    fn line_join(&mut self, join: LineJoin) {
        self.state.line_join = join;
    }

    fn fill_rule(&mut self, rule: FillRule) {
        self.state.fill_rule = rule;
    }

    fn set_transform(&mut self, transform: Affine) {
        self.state.transform = transform;
    }

    fn transform(&mut self, transform: Affine) {
        self.state.transform = self.state.transform * transform;
    }

    fn reset_transform(&mut self) {
        self.state.transform = Affine::IDENTITY;
    }

    fn current_transform(&self) -> Affine {
        self.state.transform
    }

    fn scissor(&mut self, rect: Rect) {
        self.state.scissor = Some((rect, self.device_transform()));
    }

    fn reset_scissor(&mut self) {
        self.state.scissor = None;
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn move_to(&mut self, p: Point) {
        let xf = self.device_transform();
        self.path.move_to(xf, p);
    }

    fn line_to(&mut self, p: Point) {
        let xf = self.device_transform();
        self.path.line_to(xf, p);
    }

    fn quad_to(&mut self, ctrl: Point, p: Point) {
        let xf = self.device_transform();
        self.path.quad_to(xf, ctrl, p);
    }

    fn bezier_to(&mut self, c1: Point, c2: Point, p: Point) {
        let xf = self.device_transform();
        self.path.bezier_to(xf, c1, c2, p);
    }

    fn arc_to(&mut self, p1: Point, p2: Point, radius: f64) {
        let xf = self.device_transform();
        self.path.arc_to(xf, p1, p2, radius);
    }

    fn close_path(&mut self) {
        self.path.close();
    }

    /// Vello fills by fill rule only; explicit winding is not needed.
    fn path_winding(&mut self, _winding: Winding) {}

    fn fill(&mut self) {
        if self.path.is_empty() {
            return;
        }
        let style = match self.state.fill_rule {
            FillRule::NonZero => Fill::NonZero,
            FillRule::EvenOdd => Fill::EvenOdd,
        };
        let (brush, brush_xf) = to_brush(self.state.fill);
        let path = self.path.path().clone();
        self.clipped(|scene| {
            scene.fill(style, Affine::IDENTITY, &brush, brush_xf, &path);
        });
    }

    fn stroke(&mut self) {
        if self.path.is_empty() {
            return;
        }
        let s = self.state;
        let width = f64::from(s.stroke_width) * average_scale(self.device_transform());
        let style = Stroke::new(width)
            .with_caps(cap(s.line_cap))
            .with_join(join(s.line_join))
            .with_miter_limit(f64::from(s.miter_limit));
        let (brush, brush_xf) = to_brush(s.stroke);
        let path = self.path.path().clone();
        self.clipped(|scene| {
            scene.stroke(&style, Affine::IDENTITY, &brush, brush_xf, &path);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_brush_captures_device_transform() {
        let mut scene = Scene::new();
        let mut canvas = VelloCanvas::new(&mut scene);
        canvas.begin_frame(Size::new(10.0, 10.0), 2.0);
        canvas.translate(kurbo::Vec2::new(5.0, 0.0));
        let paint =
            canvas.linear_gradient(Point::ZERO, Point::new(1.0, 0.0), Color::WHITE, Color::BLACK);
        canvas.fill_paint(paint);

        let CanvasBrush::Paint { to_device, .. } = canvas.state.fill else {
            panic!("expected gradient brush");
        };
        assert_eq!(to_device * Point::ZERO, Point::new(10.0, 0.0));
    }

    #[test]
    fn save_restore_and_reset() {
        let mut scene = Scene::new();
        let mut canvas = VelloCanvas::new(&mut scene);
        canvas.stroke_width(4.0);
        canvas.save();
        canvas.stroke_width(1.5);
        canvas.restore();
        assert_eq!(canvas.state.stroke_width, 4.0);
        canvas.reset();
        assert_eq!(canvas.state.stroke_width, 1.0);
    }

    #[test]
    fn drawing_encodes_without_panicking() {
        let mut scene = Scene::new();
        let mut canvas = VelloCanvas::new(&mut scene);
        canvas.begin_frame(Size::new(20.0, 20.0), 1.0);
        canvas.scissor(Rect::new(0.0, 0.0, 10.0, 10.0));
        canvas.begin_path();
        canvas.rounded_rect(Rect::new(1.0, 1.0, 9.0, 9.0), 2.0);
        canvas.fill_color(Color::BLACK);
        canvas.fill();
        canvas.stroke();
        // Empty paths are ignored.
        canvas.begin_path();
        canvas.fill();
        canvas.end_frame();
    }
}
