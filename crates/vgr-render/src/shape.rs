//! Geometry → path-construction calls.
//!
//! Every function here is stateless: it reads shape data and issues
//! `move_to`/`line_to`/`quad_to`/`bezier_to`/`close_path` on the canvas. It
//! never touches paints or the style stacks and never calls `begin_path`,
//! `fill` or `stroke`; the caller owns those.

use crate::canvas::{ArcDirection, Canvas};
use kurbo::{CubicBez, PathEl, Point, Rect, Vec2};
use smallvec::SmallVec;
use std::f64::consts::{FRAC_PI_2, TAU};
use vgr_core::{NodeKind, PathSeg, replay_segments};

/// Control-point distance for a quarter circle of radius 1 drawn with one
/// cubic Bézier.
pub const KAPPA90: f64 = 0.552_284_749_3;

/// Emit the outline of a shape kind. Groups, images and text emit nothing.
///
/// `tolerance` bounds the error when elliptical arcs are split into cubics.
pub fn emit_geometry<C: Canvas + ?Sized>(canvas: &mut C, kind: &NodeKind, tolerance: f64) {
    match kind {
        NodeKind::Path { segments } => emit_path(canvas, segments, tolerance),
        NodeKind::Polyline { points } => emit_points(canvas, points, false),
        NodeKind::Polygon { points } => emit_points(canvas, points, true),
        NodeKind::Line { start, end } => emit_line(canvas, *start, *end),
        NodeKind::Rect { rect, radius } => emit_rect(canvas, *rect, *radius),
        NodeKind::Circle { center, radius } => {
            emit_ellipse(canvas, *center, Vec2::new(*radius, *radius));
        }
        NodeKind::Ellipse { center, radii } => emit_ellipse(canvas, *center, *radii),
        NodeKind::Group | NodeKind::Image { .. } | NodeKind::TextSpan { .. } => {}
    }
}

/// Replay decomposed path segments in order.
///
/// Segments before the first `MoveTo` open a subpath at their own start.
pub fn emit_path<C: Canvas + ?Sized>(canvas: &mut C, segments: &[PathSeg], tolerance: f64) {
    replay_segments(segments, tolerance, |el| match el {
        PathEl::MoveTo(p) => canvas.move_to(p),
        PathEl::LineTo(p) => canvas.line_to(p),
        PathEl::QuadTo(c, p) => canvas.quad_to(c, p),
        PathEl::CurveTo(c1, c2, p) => canvas.bezier_to(c1, c2, p),
        PathEl::ClosePath => canvas.close_path(),
    });
}

/// Connect `points` with straight lines; `close` adds a closing segment.
pub fn emit_points<C: Canvas + ?Sized>(canvas: &mut C, points: &[Point], close: bool) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    canvas.move_to(*first);
    for p in rest {
        canvas.line_to(*p);
    }
    if close {
        canvas.close_path();
    }
}

/// A single open segment.
pub fn emit_line<C: Canvas + ?Sized>(canvas: &mut C, start: Point, end: Point) {
    canvas.move_to(start);
    canvas.line_to(end);
}

/// Closed rectangle; `radius > 0` rounds all four corners identically with
/// cubic quarter-arcs. The radius is clamped to half of the shorter side.
pub fn emit_rect<C: Canvas + ?Sized>(canvas: &mut C, rect: Rect, radius: f64) {
    let (x, y, w, h) = (rect.x0, rect.y0, rect.width(), rect.height());

    if !radius.is_finite() || radius <= 0.0 {
        canvas.move_to(Point::new(x, y));
        canvas.line_to(Point::new(x, y + h));
        canvas.line_to(Point::new(x + w, y + h));
        canvas.line_to(Point::new(x + w, y));
        canvas.close_path();
        return;
    }

    let r = radius.min(w.abs() * 0.5).min(h.abs() * 0.5);
    let rx = r * w.signum();
    let ry = r * h.signum();
    let kx = rx * (1.0 - KAPPA90);
    let ky = ry * (1.0 - KAPPA90);

    canvas.move_to(Point::new(x, y + ry));
    canvas.line_to(Point::new(x, y + h - ry));
    canvas.bezier_to(
        Point::new(x, y + h - ky),
        Point::new(x + kx, y + h),
        Point::new(x + rx, y + h),
    );
    canvas.line_to(Point::new(x + w - rx, y + h));
    canvas.bezier_to(
        Point::new(x + w - kx, y + h),
        Point::new(x + w, y + h - ky),
        Point::new(x + w, y + h - ry),
    );
    canvas.line_to(Point::new(x + w, y + ry));
    canvas.bezier_to(
        Point::new(x + w, y + ky),
        Point::new(x + w - kx, y),
        Point::new(x + w - rx, y),
    );
    canvas.line_to(Point::new(x + rx, y));
    canvas.bezier_to(Point::new(x + kx, y), Point::new(x, y + ky), Point::new(x, y + ry));
    canvas.close_path();
}

/// Closed ellipse as four cubic quarter-arcs, starting at the leftmost point.
pub fn emit_ellipse<C: Canvas + ?Sized>(canvas: &mut C, center: Point, radii: Vec2) {
    let (cx, cy) = (center.x, center.y);
    let (rx, ry) = (radii.x, radii.y);
    let (kx, ky) = (rx * KAPPA90, ry * KAPPA90);

    canvas.move_to(Point::new(cx - rx, cy));
    canvas.bezier_to(
        Point::new(cx - rx, cy + ky),
        Point::new(cx - kx, cy + ry),
        Point::new(cx, cy + ry),
    );
    canvas.bezier_to(
        Point::new(cx + kx, cy + ry),
        Point::new(cx + rx, cy + ky),
        Point::new(cx + rx, cy),
    );
    canvas.bezier_to(
        Point::new(cx + rx, cy - ky),
        Point::new(cx + kx, cy - ry),
        Point::new(cx, cy - ry),
    );
    canvas.bezier_to(
        Point::new(cx - kx, cy - ry),
        Point::new(cx - rx, cy - ky),
        Point::new(cx - rx, cy),
    );
    canvas.close_path();
}

// ─── Circular arcs ───────────────────────────────────────────────────────

/// A circular arc split into at most five cubic pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcCurves {
    pub start: Point,
    pub curves: SmallVec<[CubicBez; 5]>,
}

/// Split the arc of `radius` around `center` from angle `a0` to `a1` into
/// cubic pieces of at most a quarter turn.
pub fn arc_curves(center: Point, radius: f64, a0: f64, a1: f64, dir: ArcDirection) -> ArcCurves {
    let mut da = a1 - a0;
    match dir {
        ArcDirection::Clockwise => {
            if da.abs() >= TAU {
                da = TAU;
            } else {
                while da < 0.0 {
                    da += TAU;
                }
            }
        }
        ArcDirection::CounterClockwise => {
            if da.abs() >= TAU {
                da = -TAU;
            } else {
                while da > 0.0 {
                    da -= TAU;
                }
            }
        }
    }

    let divs = ((da.abs() / FRAC_PI_2 + 0.5) as usize).clamp(1, 5);
    let half = da / divs as f64 / 2.0;
    let mut kappa = (4.0 / 3.0 * (1.0 - half.cos()) / half.sin()).abs();
    if kappa.is_nan() {
        kappa = 0.0;
    }
    if dir == ArcDirection::CounterClockwise {
        kappa = -kappa;
    }

    let point_at = |a: f64| {
        let (sin, cos) = a.sin_cos();
        let p = Point::new(center.x + cos * radius, center.y + sin * radius);
        let tangent = Vec2::new(-sin * radius * kappa, cos * radius * kappa);
        (p, tangent)
    };

    let (start, mut prev_tan) = point_at(a0);
    let mut prev = start;
    let mut curves = SmallVec::new();
    for i in 1..=divs {
        let (p, tan) = point_at(a0 + da * (i as f64 / divs as f64));
        curves.push(CubicBez::new(prev, prev + prev_tan, p - tan, p));
        prev = p;
        prev_tan = tan;
    }
    ArcCurves { start, curves }
}

/// Emit a circular arc. With `connect`, a line joins the current point to
/// the arc start; otherwise the arc begins a new subpath.
pub fn emit_arc<C: Canvas + ?Sized>(
    canvas: &mut C,
    center: Point,
    radius: f64,
    a0: f64,
    a1: f64,
    dir: ArcDirection,
    connect: bool,
) {
    let arc = arc_curves(center, radius, a0, a1, dir);
    if connect {
        canvas.line_to(arc.start);
    } else {
        canvas.move_to(arc.start);
    }
    for c in &arc.curves {
        canvas.bezier_to(c.p1, c.p2, c.p3);
    }
}

/// Result of fitting a tangent arc into the corner `from` → `p1` → `p2`.
#[derive(Debug, Clone, PartialEq)]
pub enum TangentArc {
    /// Degenerate corner: continue with a straight line to `p1`.
    Line(Point),
    /// Line to `arc.start`, then the arc pieces.
    Arc(ArcCurves),
}

/// Geometry behind `arc_to`: the arc of `radius` tangent to both corner legs.
pub fn tangent_arc(from: Point, p1: Point, p2: Point, radius: f64) -> TangentArc {
    const DIST_TOL: f64 = 0.01;
    let near = |a: Point, b: Point| (a - b).hypot() < DIST_TOL;

    if near(from, p1) || near(p1, p2) || radius < DIST_TOL {
        return TangentArc::Line(p1);
    }
    let d0 = (from - p1).normalize();
    let d1 = (p2 - p1).normalize();
    // Collinear legs have no tangent circle.
    if d0.cross(d1).abs() < 1e-9 {
        return TangentArc::Line(p1);
    }

    let a = d0.dot(d1).clamp(-1.0, 1.0).acos();
    let d = radius / (a / 2.0).tan();
    if d > 10_000.0 {
        return TangentArc::Line(p1);
    }

    let (center, a0, a1, dir) = if d1.cross(d0) > 0.0 {
        (
            Point::new(p1.x + d0.x * d + d0.y * radius, p1.y + d0.y * d - d0.x * radius),
            d0.x.atan2(-d0.y),
            (-d1.x).atan2(d1.y),
            ArcDirection::Clockwise,
        )
    } else {
        (
            Point::new(p1.x + d0.x * d - d0.y * radius, p1.y + d0.y * d + d0.x * radius),
            (-d0.x).atan2(d0.y),
            d1.x.atan2(-d1.y),
            ArcDirection::CounterClockwise,
        )
    };
    TangentArc::Arc(arc_curves(center, radius, a0, a1, dir))
}
