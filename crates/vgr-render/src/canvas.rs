//! The immediate-mode drawing surface the renderer drives.
//!
//! `Canvas` mirrors a nanovg-style context: state (transform, paints, stroke
//! parameters) is set first, a path is built with `begin_path`/`move_to`/...,
//! then `fill` or `stroke` executes against the current state. Points are
//! transformed by the current transform as they are added to the path.
//!
//! Implementations: [`RecordingCanvas`](crate::RecordingCanvas),
//! [`VelloCanvas`](crate::VelloCanvas), and the Canvas2D adapter in
//! `vgr-wasm`.

use crate::shape;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use vgr_core::{Color, FillRule, LineCap, LineJoin};

/// Orientation of a subpath, used by [`Canvas::path_winding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Winding {
    /// Counter-clockwise: fills solid.
    #[default]
    Solid,
    /// Clockwise: cuts a hole.
    Hole,
}

/// Sweep direction for [`Canvas::arc`], in y-down screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    /// Increasing angle.
    Clockwise,
    /// Decreasing angle.
    CounterClockwise,
}

/// Geometry of a two-color gradient paint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientShape {
    Linear {
        start: Point,
        end: Point,
    },
    Radial {
        center: Point,
        inner_radius: f64,
        outer_radius: f64,
    },
    /// Feathered rounded rectangle, useful for drop shadows.
    Box {
        rect: Rect,
        radius: f64,
        feather: f64,
    },
}

/// Opaque paint handle returned by the gradient factories.
///
/// Colors ramp from `inner` to `outer` across the gradient geometry.
/// `transform` maps the geometry into the user space active when the paint
/// is set with [`Canvas::fill_paint`] / [`Canvas::stroke_paint`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasPaint {
    pub shape: GradientShape,
    pub inner: Color,
    pub outer: Color,
    pub transform: Affine,
}

impl CanvasPaint {
    pub fn new(shape: GradientShape, inner: Color, outer: Color) -> Self {
        Self {
            shape,
            inner,
            outer,
            transform: Affine::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    /// Scale both colors' alpha.
    #[must_use]
    pub fn with_alpha_factor(mut self, factor: f32) -> Self {
        self.inner = self.inner.with_alpha_factor(factor);
        self.outer = self.outer.with_alpha_factor(factor);
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.inner.is_transparent() && self.outer.is_transparent()
    }
}

/// Output surface size and device pixel ratio for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            pixel_ratio: 1.0,
        }
    }
}

impl Viewport {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Transform that scales content of `content` size to fit the viewport,
    /// keeping aspect ratio, centered.
    pub fn fit(&self, content: Size) -> Affine {
        if content.width <= 0.0 || content.height <= 0.0 {
            return Affine::IDENTITY;
        }
        let scale = (self.width / content.width).min(self.height / content.height);
        let x = (self.width - content.width * scale) / 2.0;
        let y = (self.height - content.height * scale) / 2.0;
        Affine::translate((x, y)) * Affine::scale(scale)
    }
}

/// Mean of the x and y axis scale factors; maps stroke widths and radii
/// through a transform.
pub fn average_scale(xf: Affine) -> f64 {
    let [a, b, c, d, _, _] = xf.as_coeffs();
    ((a * a + b * b).sqrt() + (c * c + d * d).sqrt()) * 0.5
}

/// An immediate-mode 2D drawing surface.
///
/// Required methods are the primitives a backend must provide. Provided
/// methods reduce convenience operations (named transforms, common shapes,
/// gradient factories) to those primitives; backends with native versions
/// may override them.
pub trait Canvas {
    // ─── Frame ───────────────────────────────────────────────────────────

    /// Start a frame. All drawing happens between `begin_frame` and
    /// `end_frame`.
    fn begin_frame(&mut self, size: Size, pixel_ratio: f32);
    fn end_frame(&mut self);

    // ─── State ───────────────────────────────────────────────────────────

    /// Push a copy of the current render state.
    fn save(&mut self);
    /// Pop the render state pushed by the matching `save`.
    fn restore(&mut self);
    /// Reset the current render state to defaults (saved states untouched).
    fn reset(&mut self);

    // ─── Render styles ───────────────────────────────────────────────────

    fn fill_color(&mut self, color: Color);
    fn fill_paint(&mut self, paint: CanvasPaint);
    fn stroke_color(&mut self, color: Color);
    fn stroke_paint(&mut self, paint: CanvasPaint);
    fn stroke_width(&mut self, width: f32);
    fn miter_limit(&mut self, limit: f32);
    fn line_cap(&mut self, cap: LineCap);
    fn line_join(&mut self, join: LineJoin);
    fn fill_rule(&mut self, rule: FillRule);

    // ─── Transforms ──────────────────────────────────────────────────────

    fn set_transform(&mut self, transform: Affine);
    /// Post-multiply: `current = current ∘ transform`, so `transform` acts
    /// in the current local space.
    fn transform(&mut self, transform: Affine);
    fn reset_transform(&mut self);
    fn current_transform(&self) -> Affine;

    fn translate(&mut self, offset: Vec2) {
        self.transform(Affine::translate(offset));
    }

    fn rotate(&mut self, radians: f64) {
        self.transform(Affine::rotate(radians));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.transform(Affine::scale_non_uniform(sx, sy));
    }

    fn skew_x(&mut self, radians: f64) {
        self.transform(Affine::skew(radians.tan(), 0.0));
    }

    fn skew_y(&mut self, radians: f64) {
        self.transform(Affine::skew(0.0, radians.tan()));
    }

    // ─── Paints ──────────────────────────────────────────────────────────

    fn linear_gradient(&self, start: Point, end: Point, inner: Color, outer: Color) -> CanvasPaint {
        CanvasPaint::new(GradientShape::Linear { start, end }, inner, outer)
    }

    fn radial_gradient(
        &self,
        center: Point,
        inner_radius: f64,
        outer_radius: f64,
        inner: Color,
        outer: Color,
    ) -> CanvasPaint {
        CanvasPaint::new(
            GradientShape::Radial {
                center,
                inner_radius,
                outer_radius,
            },
            inner,
            outer,
        )
    }

    fn box_gradient(
        &self,
        rect: Rect,
        radius: f64,
        feather: f64,
        inner: Color,
        outer: Color,
    ) -> CanvasPaint {
        CanvasPaint::new(
            GradientShape::Box {
                rect,
                radius,
                feather,
            },
            inner,
            outer,
        )
    }

    // ─── Scissoring ──────────────────────────────────────────────────────

    /// Clip subsequent drawing to `rect`, in the current transform.
    fn scissor(&mut self, rect: Rect);
    fn reset_scissor(&mut self);

    // ─── Paths ───────────────────────────────────────────────────────────

    fn begin_path(&mut self);
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point);
    fn quad_to(&mut self, ctrl: Point, p: Point);
    fn bezier_to(&mut self, c1: Point, c2: Point, p: Point);
    /// Arc of `radius` tangent to the lines (current → `p1`) and
    /// (`p1` → `p2`).
    fn arc_to(&mut self, p1: Point, p2: Point, radius: f64);
    fn close_path(&mut self);
    fn path_winding(&mut self, winding: Winding);

    /// Circular arc as a new subpath.
    fn arc(&mut self, center: Point, radius: f64, a0: f64, a1: f64, dir: ArcDirection) {
        shape::emit_arc(self, center, radius, a0, a1, dir, false);
    }

    fn rect(&mut self, rect: Rect) {
        shape::emit_rect(self, rect, 0.0);
    }

    fn rounded_rect(&mut self, rect: Rect, radius: f64) {
        shape::emit_rect(self, rect, radius);
    }

    fn ellipse(&mut self, center: Point, rx: f64, ry: f64) {
        shape::emit_ellipse(self, center, Vec2::new(rx, ry));
    }

    fn circle(&mut self, center: Point, radius: f64) {
        shape::emit_ellipse(self, center, Vec2::new(radius, radius));
    }

    fn polyline(&mut self, points: &[Point]) {
        shape::emit_points(self, points, false);
    }

    // ─── Execution ───────────────────────────────────────────────────────

    /// Fill the current path. Open subpaths are implicitly closed.
    fn fill(&mut self);
    /// Stroke the current path. Open subpaths stay open.
    fn stroke(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_centers_and_preserves_aspect() {
        let viewport = Viewport {
            width: 200.0,
            height: 100.0,
            pixel_ratio: 2.0,
        };
        let m = viewport.fit(Size::new(50.0, 50.0));
        assert_eq!(m * Point::new(0.0, 0.0), Point::new(50.0, 0.0));
        assert_eq!(m * Point::new(50.0, 50.0), Point::new(150.0, 100.0));
    }

    #[test]
    fn fit_ignores_empty_content() {
        let m = Viewport::default().fit(Size::ZERO);
        assert_eq!(m, Affine::IDENTITY);
    }

    #[test]
    fn average_scale_of_uniform_and_rotated() {
        assert_eq!(average_scale(Affine::scale(3.0)), 3.0);
        assert!((average_scale(Affine::rotate(0.7) * Affine::scale(2.0)) - 2.0).abs() < 1e-12);
        assert_eq!(average_scale(Affine::scale_non_uniform(1.0, 3.0)), 2.0);
    }

    #[test]
    fn paint_alpha_factor_applies_to_both_colors() {
        let paint = CanvasPaint::new(
            GradientShape::Linear {
                start: Point::ZERO,
                end: Point::new(1.0, 0.0),
            },
            Color::WHITE,
            Color::BLACK,
        )
        .with_alpha_factor(0.5);
        assert_eq!(paint.inner.a, 0.5);
        assert_eq!(paint.outer.a, 0.5);
        assert!(!paint.is_transparent());
        assert!(paint.with_alpha_factor(0.0).is_transparent());
    }
}
