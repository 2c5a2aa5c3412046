//! Canvas → HTML `CanvasRenderingContext2d`.
//!
//! Canvas2D transforms path points when they are added, like the `Canvas`
//! trait, so the context transform is kept in sync eagerly. Paint and
//! stroke state is mirrored in Rust and applied to the context right
//! before each `fill` / `stroke`. Failed web-sys calls are logged.

use kurbo::{Affine, Point, Rect, Size};
use vgr_core::{Color, FillRule, LineCap, LineJoin};
use vgr_render::{Canvas, CanvasPaint, GradientShape, Winding, average_scale};
use wasm_bindgen::JsValue;
use web_sys::{CanvasGradient, CanvasRenderingContext2d, CanvasWindingRule, Path2d};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Brush {
    Color(Color),
    /// `to_device` maps the paint geometry into device pixels.
    Paint { paint: CanvasPaint, to_device: Affine },
}

#[derive(Debug, Clone, Copy)]
struct State {
    transform: Affine,
    fill: Brush,
    stroke: Brush,
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
            fill: Brush::Color(Color::WHITE),
            stroke: Brush::Color(Color::BLACK),
            stroke_width: 1.0,
            miter_limit: 10.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            fill_rule: FillRule::NonZero,
            scissor: None,
        }
    }
}

/// Gradient geometry as `createLinearGradient` / `createRadialGradient`
/// arguments, in the user space of the fill call.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Geometry {
    Linear(Point, Point),
    Radial(Point, f64, f64),
}

/// Re-express paint geometry through `local`. Radii scale by the average
/// scale factor, so skewed or non-uniform paint transforms are approximate.
fn gradient_geometry(shape: GradientShape, local: Affine) -> Geometry {
    match shape {
        GradientShape::Linear { start, end } => Geometry::Linear(local * start, local * end),
        GradientShape::Radial {
            center,
            inner_radius,
            outer_radius,
        } => {
            let s = average_scale(local);
            Geometry::Radial(local * center, inner_radius * s, outer_radius * s)
        }
        GradientShape::Box { rect, feather, .. } => {
            let s = average_scale(local);
            let half = rect.width().min(rect.height()) * 0.5;
            let feather = feather.max(0.0);
            Geometry::Radial(
                local * rect.center(),
                (half - feather * 0.5).max(0.0) * s,
                (half + feather * 0.5) * s,
            )
        }
    }
}

fn line_cap_str(cap: LineCap) -> &'static str {
    match cap {
        LineCap::Butt => "butt",
        LineCap::Round => "round",
        LineCap::Square => "square",
    }
}

fn line_join_str(join: LineJoin) -> &'static str {
    match join {
        LineJoin::Miter => "miter",
        LineJoin::Round => "round",
        LineJoin::Bevel => "bevel",
    }
}

pub(crate) fn warn_on_err(call: &str, result: Result<(), JsValue>) {
    if let Err(err) = result {
        log::warn!("canvas2d {call} failed: {err:?}");
    }
}

fn set_ctx_transform(ctx: &CanvasRenderingContext2d, xf: Affine) {
    let [a, b, c, d, e, f] = xf.as_coeffs();
    warn_on_err("setTransform", ctx.set_transform(a, b, c, d, e, f));
}

/// A [`Canvas`] over a browser 2D context.
pub struct Canvas2dCanvas {
    ctx: CanvasRenderingContext2d,
    /// Logical → device pixels.
    base: Affine,
    state: State,
    saved: Vec<State>,
}

impl Canvas2dCanvas {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self {
            ctx,
            base: Affine::IDENTITY,
            state: State::default(),
            saved: Vec::new(),
        }
    }

    pub fn context(&self) -> &CanvasRenderingContext2d {
        &self.ctx
    }

    fn device_transform(&self) -> Affine {
        self.base * self.state.transform
    }

    fn sync_transform(&self) {
        set_ctx_transform(&self.ctx, self.device_transform());
    }

    fn brush(&self, paint: CanvasPaint) -> Brush {
        Brush::Paint {
            paint,
            to_device: self.device_transform() * paint.transform,
        }
    }

    fn create_gradient(&self, paint: &CanvasPaint, to_device: Affine) -> Option<CanvasGradient> {
        let device = self.device_transform();
        if device.determinant().abs() < 1e-12 {
            return None;
        }
        let gradient = match gradient_geometry(paint.shape, device.inverse() * to_device) {
            Geometry::Linear(a, b) => self.ctx.create_linear_gradient(a.x, a.y, b.x, b.y),
            Geometry::Radial(c, r0, r1) => {
                match self.ctx.create_radial_gradient(c.x, c.y, r0, c.x, c.y, r1) {
                    Ok(g) => g,
                    Err(err) => {
                        log::warn!("canvas2d createRadialGradient failed: {err:?}");
                        return None;
                    }
                }
            }
        };
        warn_on_err("addColorStop", gradient.add_color_stop(0.0, &paint.inner.to_css()));
        warn_on_err("addColorStop", gradient.add_color_stop(1.0, &paint.outer.to_css()));
        Some(gradient)
    }

    fn apply_fill_style(&self) {
        match self.state.fill {
            Brush::Color(c) => self.ctx.set_fill_style_str(&c.to_css()),
            Brush::Paint { paint, to_device } => match self.create_gradient(&paint, to_device) {
                Some(g) => self.ctx.set_fill_style_canvas_gradient(&g),
                None => self.ctx.set_fill_style_str(&paint.inner.to_css()),
            },
        }
    }

    fn apply_stroke_style(&self) {
        let s = &self.state;
        match s.stroke {
            Brush::Color(c) => self.ctx.set_stroke_style_str(&c.to_css()),
            Brush::Paint { paint, to_device } => match self.create_gradient(&paint, to_device) {
                Some(g) => self.ctx.set_stroke_style_canvas_gradient(&g),
                None => self.ctx.set_stroke_style_str(&paint.inner.to_css()),
            },
        }
        self.ctx.set_line_width(f64::from(s.stroke_width));
        self.ctx.set_line_cap(line_cap_str(s.line_cap));
        self.ctx.set_line_join(line_join_str(s.line_join));
        self.ctx.set_miter_limit(f64::from(s.miter_limit));
    }

    /// Run `draw` clipped to the current scissor, if any. The current path
    /// is not part of the saved context state and survives the clip.
    fn clipped(&self, draw: impl FnOnce(&CanvasRenderingContext2d)) {
        let Some((rect, xf)) = self.state.scissor else {
            draw(&self.ctx);
            return;
        };
        let clip = match Path2d::new() {
            Ok(p) => p,
            Err(err) => {
                log::warn!("canvas2d Path2D failed: {err:?}");
                draw(&self.ctx);
                return;
            }
        };
        clip.rect(rect.x0, rect.y0, rect.width(), rect.height());

        self.ctx.save();
        set_ctx_transform(&self.ctx, xf);
        self.ctx.clip_with_path_2d(&clip);
        self.sync_transform();
        draw(&self.ctx);
        self.ctx.restore();
    }
}

impl Canvas for Canvas2dCanvas {
    fn begin_frame(&mut self, size: Size, pixel_ratio: f32) {
        log::trace!("canvas2d frame {}x{} @{pixel_ratio}", size.width, size.height);
        self.base = Affine::scale(f64::from(pixel_ratio));
        self.saved.clear();
        self.state = State::default();
        self.ctx.begin_path();
        self.sync_transform();
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
            self.sync_transform();
        }
    }

    fn reset(&mut self) {
        self.state = State::default();
        self.sync_transform();
    }

    fn fill_color(&mut self, color: Color) {
        self.state.fill = Brush::Color(color);
    }

    fn fill_paint(&mut self, paint: CanvasPaint) {
        self.state.fill = self.brush(paint);
    }

    fn stroke_color(&mut self, color: Color) {
        self.state.stroke = Brush::Color(color);
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
        self.sync_transform();
    }

    fn transform(&mut self, transform: Affine) {
        self.state.transform = self.state.transform * transform;
        self.sync_transform();
    }

    fn reset_transform(&mut self) {
        self.state.transform = Affine::IDENTITY;
        self.sync_transform();
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
        self.ctx.begin_path();
    }

    fn move_to(&mut self, p: Point) {
        self.ctx.move_to(p.x, p.y);
    }

    fn line_to(&mut self, p: Point) {
        self.ctx.line_to(p.x, p.y);
    }

    fn quad_to(&mut self, ctrl: Point, p: Point) {
        self.ctx.quadratic_curve_to(ctrl.x, ctrl.y, p.x, p.y);
    }

    fn bezier_to(&mut self, c1: Point, c2: Point, p: Point) {
        self.ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y);
    }

    fn arc_to(&mut self, p1: Point, p2: Point, radius: f64) {
        warn_on_err("arcTo", self.ctx.arc_to(p1.x, p1.y, p2.x, p2.y, radius));
    }

    fn close_path(&mut self) {
        self.ctx.close_path();
    }

    /// Canvas2D fills by winding rule; explicit winding is not needed.
    fn path_winding(&mut self, _winding: Winding) {}

    fn fill(&mut self) {
        self.apply_fill_style();
        let rule = self.state.fill_rule;
        self.clipped(|ctx| match rule {
            FillRule::NonZero => ctx.fill(),
            FillRule::EvenOdd => ctx.fill_with_canvas_winding_rule(CanvasWindingRule::Evenodd),
        });
    }

    fn stroke(&mut self) {
        self.apply_stroke_style();
        self.clipped(|ctx| ctx.stroke());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn linear_geometry_maps_endpoints() {
        let geometry = gradient_geometry(
            GradientShape::Linear {
                start: Point::ZERO,
                end: Point::new(1.0, 0.0),
            },
            Affine::translate((5.0, 5.0)) * Affine::scale(10.0),
        );
        assert_eq!(
            geometry,
            Geometry::Linear(Point::new(5.0, 5.0), Point::new(15.0, 5.0))
        );
    }

    #[test]
    fn radial_radii_scale_with_transform() {
        let geometry = gradient_geometry(
            GradientShape::Radial {
                center: Point::new(1.0, 1.0),
                inner_radius: 0.5,
                outer_radius: 2.0,
            },
            Affine::scale(4.0),
        );
        assert_eq!(geometry, Geometry::Radial(Point::new(4.0, 4.0), 2.0, 8.0));
    }

    #[test]
    fn box_gradient_spans_feather_band() {
        let geometry = gradient_geometry(
            GradientShape::Box {
                rect: Rect::new(0.0, 0.0, 20.0, 10.0),
                radius: 2.0,
                feather: 4.0,
            },
            Affine::IDENTITY,
        );
        assert_eq!(geometry, Geometry::Radial(Point::new(10.0, 5.0), 3.0, 7.0));
    }

    #[test]
    fn css_keywords() {
        assert_eq!(line_cap_str(LineCap::Square), "square");
        assert_eq!(line_join_str(LineJoin::Bevel), "bevel");
    }
}
