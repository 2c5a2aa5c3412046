//! Device-space path accumulation shared by the buffered backends.
//!
//! Points are mapped through the transform active when they are added, so a
//! transform change in the middle of a path only affects later points.

use crate::shape::{self, TangentArc};
use kurbo::{Affine, BezPath, Point};

#[derive(Debug, Clone, Default)]
pub(crate) struct DevicePath {
    path: BezPath,
    /// Current point in the caller's local space, `None` before the first
    /// `move_to`.
    current: Option<Point>,
    start: Point,
}

impl DevicePath {
    pub fn clear(&mut self) {
        self.path = BezPath::new();
        self.current = None;
        self.start = Point::ZERO;
    }

    pub fn path(&self) -> &BezPath {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.path.elements().is_empty()
    }

    pub fn move_to(&mut self, xf: Affine, p: Point) {
        self.path.move_to(xf * p);
        self.current = Some(p);
        self.start = p;
    }

    /// A segment without a current point starts a subpath at its first point.
    fn ensure_subpath(&mut self, xf: Affine, first: Point) {
        if self.current.is_none() {
            self.move_to(xf, first);
        }
    }

    pub fn line_to(&mut self, xf: Affine, p: Point) {
        self.ensure_subpath(xf, p);
        self.path.line_to(xf * p);
        self.current = Some(p);
    }

    pub fn quad_to(&mut self, xf: Affine, ctrl: Point, p: Point) {
        self.ensure_subpath(xf, ctrl);
        self.path.quad_to(xf * ctrl, xf * p);
        self.current = Some(p);
    }

    pub fn bezier_to(&mut self, xf: Affine, c1: Point, c2: Point, p: Point) {
        self.ensure_subpath(xf, c1);
        self.path.curve_to(xf * c1, xf * c2, xf * p);
        self.current = Some(p);
    }

    /// Tangent arc from the current point; ignored without one.
    pub fn arc_to(&mut self, xf: Affine, p1: Point, p2: Point, radius: f64) {
        let Some(from) = self.current else {
            return;
        };
        match shape::tangent_arc(from, p1, p2, radius) {
            TangentArc::Line(p) => self.line_to(xf, p),
            TangentArc::Arc(arc) => {
                self.line_to(xf, arc.start);
                for c in &arc.curves {
                    self.bezier_to(xf, c.p1, c.p2, c.p3);
                }
            }
        }
    }

    pub fn close(&mut self) {
        if self.current.is_some() {
            self.path.close_path();
            self.current = Some(self.start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::PathEl;

    #[test]
    fn points_use_transform_at_insertion() {
        let mut path = DevicePath::default();
        path.move_to(Affine::IDENTITY, Point::new(1.0, 1.0));
        path.line_to(Affine::scale(2.0), Point::new(1.0, 1.0));
        assert_eq!(
            path.path().elements(),
            &[
                PathEl::MoveTo(Point::new(1.0, 1.0)),
                PathEl::LineTo(Point::new(2.0, 2.0)),
            ]
        );
    }

    #[test]
    fn line_without_move_starts_subpath() {
        let mut path = DevicePath::default();
        path.line_to(Affine::IDENTITY, Point::new(3.0, 4.0));
        assert_eq!(path.path().elements().len(), 2);
        assert!(matches!(path.path().elements()[0], PathEl::MoveTo(_)));
    }

    #[test]
    fn arc_to_without_current_point_is_ignored() {
        let mut path = DevicePath::default();
        path.arc_to(Affine::IDENTITY, Point::new(1.0, 0.0), Point::new(1.0, 1.0), 0.5);
        assert!(path.is_empty());
    }

    #[test]
    fn clear_forgets_current_point() {
        let mut path = DevicePath::default();
        path.move_to(Affine::IDENTITY, Point::ZERO);
        path.close();
        path.clear();
        assert!(path.is_empty());
        path.close();
        assert!(path.is_empty());
    }
}
