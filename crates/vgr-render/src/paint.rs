//! Paint resolution: document paints → canvas colors and gradient paints.

use crate::canvas::{Canvas, CanvasPaint};
use kurbo::Affine;
use vgr_core::{Color, Document, Gradient, GradientKind, GradientUnits, NodeKind, Paint};

/// A paint ready to hand to the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedPaint {
    Color(Color),
    Gradient(CanvasPaint),
}

/// Resolve `paint` for a shape of `kind`, with alpha scaled by `opacity`.
///
/// `None` when there is nothing to draw: a `none` paint, an unknown or
/// unusable paint server, or a fully transparent result.
pub fn resolve_paint<C: Canvas + ?Sized>(
    canvas: &C,
    doc: &Document,
    paint: Paint,
    kind: &NodeKind,
    opacity: f32,
) -> Option<ResolvedPaint> {
    let resolved = match paint {
        Paint::None => return None,
        Paint::Color(color) => ResolvedPaint::Color(color.with_alpha_factor(opacity)),
        Paint::Server(id) => {
            let Some(gradient) = doc.gradient(id) else {
                log::debug!("unknown paint server {id}");
                return None;
            };
            resolve_gradient(canvas, gradient, kind, opacity)?
        }
    };

    let transparent = match &resolved {
        ResolvedPaint::Color(c) => c.is_transparent(),
        ResolvedPaint::Gradient(p) => p.is_transparent(),
    };
    (!transparent).then_some(resolved)
}

/// Map a gradient onto the canvas' two-color gradient paints.
///
/// The canvas interpolates between two colors only, so the first and last
/// stops are used and the gradient geometry is shortened to their offsets.
pub fn resolve_gradient<C: Canvas + ?Sized>(
    canvas: &C,
    gradient: &Gradient,
    kind: &NodeKind,
    opacity: f32,
) -> Option<ResolvedPaint> {
    let (Some(first), Some(last)) = (gradient.stops.first(), gradient.stops.last()) else {
        log::debug!("gradient without stops");
        return None;
    };
    let inner = first.color.with_alpha_factor(opacity);
    let outer = last.color.with_alpha_factor(opacity);
    if gradient.stops.len() == 1 || first.offset >= last.offset {
        return Some(ResolvedPaint::Color(outer));
    }

    let units = match gradient.units {
        GradientUnits::UserSpaceOnUse => Affine::IDENTITY,
        GradientUnits::ObjectBoundingBox => {
            let bbox = kind.bounding_box()?;
            if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
                log::debug!("bounding-box gradient on a {} with empty bounds", kind.name());
                return None;
            }
            Affine::new([bbox.width(), 0.0, 0.0, bbox.height(), bbox.x0, bbox.y0])
        }
    };
    let transform = units * gradient.transform;
    let (t0, t1) = (
        f64::from(first.offset.clamp(0.0, 1.0)),
        f64::from(last.offset.clamp(0.0, 1.0)),
    );

    let paint = match gradient.kind {
        GradientKind::Linear { start, end } => {
            if (end - start).hypot() < 1e-9 {
                log::debug!("zero-length linear gradient");
                return None;
            }
            canvas.linear_gradient(start.lerp(end, t0), start.lerp(end, t1), inner, outer)
        }
        GradientKind::Radial { center, radius } => {
            if radius.is_nan() || radius <= 0.0 {
                log::debug!("radial gradient with radius {radius}");
                return None;
            }
            canvas.radial_gradient(center, radius * t0, radius * t1, inner, outer)
        }
    };
    Some(ResolvedPaint::Gradient(paint.with_transform(transform)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::GradientShape;
    use crate::recording::RecordingCanvas;
    use kurbo::{Point, Rect, Size};
    use vgr_core::NodeId;

    fn rect_kind() -> NodeKind {
        NodeKind::Rect {
            rect: Rect::new(10.0, 20.0, 30.0, 60.0),
            radius: 0.0,
        }
    }

    fn doc_with(gradient: Gradient) -> Document {
        let mut doc = Document::new(Size::new(100.0, 100.0));
        doc.add_gradient("g", gradient);
        doc
    }

    fn resolve(doc: &Document, paint: Paint, opacity: f32) -> Option<ResolvedPaint> {
        resolve_paint(&RecordingCanvas::new(), doc, paint, &rect_kind(), opacity)
    }

    #[test]
    fn color_alpha_scales_with_opacity() {
        let doc = Document::new(Size::new(1.0, 1.0));
        assert_eq!(
            resolve(&doc, Paint::Color(Color::WHITE), 0.5),
            Some(ResolvedPaint::Color(Color::rgba(1.0, 1.0, 1.0, 0.5)))
        );
        assert_eq!(resolve(&doc, Paint::None, 1.0), None);
        assert_eq!(resolve(&doc, Paint::Color(Color::TRANSPARENT), 1.0), None);
    }

    #[test]
    fn unknown_server_resolves_to_nothing() {
        let doc = Document::new(Size::new(1.0, 1.0));
        assert_eq!(resolve(&doc, Paint::Server(NodeId::intern("nowhere")), 1.0), None);
    }

    #[test]
    fn bounding_box_units_map_unit_square() {
        let doc = doc_with(
            Gradient::linear((0.0, 0.0), (1.0, 0.0))
                .with_units(GradientUnits::ObjectBoundingBox)
                .with_stop(0.0, Color::WHITE)
                .with_stop(1.0, Color::BLACK),
        );
        let Some(ResolvedPaint::Gradient(paint)) =
            resolve(&doc, Paint::Server(NodeId::intern("g")), 1.0)
        else {
            panic!("expected gradient");
        };
        let GradientShape::Linear { start, end } = paint.shape else {
            panic!("expected linear shape");
        };
        assert_eq!(paint.transform * start, Point::new(10.0, 20.0));
        assert_eq!(paint.transform * end, Point::new(30.0, 20.0));
    }

    #[test]
    fn stop_offsets_shorten_geometry() {
        let doc = doc_with(
            Gradient::radial((0.0, 0.0), 10.0)
                .with_stop(0.25, Color::WHITE)
                .with_stop(0.75, Color::BLACK),
        );
        let Some(ResolvedPaint::Gradient(paint)) =
            resolve(&doc, Paint::Server(NodeId::intern("g")), 1.0)
        else {
            panic!("expected gradient");
        };
        assert_eq!(
            paint.shape,
            GradientShape::Radial {
                center: Point::ZERO,
                inner_radius: 2.5,
                outer_radius: 7.5,
            }
        );
    }

    #[test]
    fn invalid_gradients_are_skipped() {
        let id = Paint::Server(NodeId::intern("g"));
        let empty = doc_with(Gradient::linear((0.0, 0.0), (1.0, 0.0)));
        assert_eq!(resolve(&empty, id, 1.0), None);

        let zero_length = doc_with(
            Gradient::linear((5.0, 5.0), (5.0, 5.0))
                .with_stop(0.0, Color::WHITE)
                .with_stop(1.0, Color::BLACK),
        );
        assert_eq!(resolve(&zero_length, id, 1.0), None);

        let flat = doc_with(
            Gradient::radial((0.0, 0.0), 0.0)
                .with_stop(0.0, Color::WHITE)
                .with_stop(1.0, Color::BLACK),
        );
        assert_eq!(resolve(&flat, id, 1.0), None);
    }

    #[test]
    fn single_stop_is_solid() {
        let doc = doc_with(Gradient::linear((0.0, 0.0), (1.0, 0.0)).with_stop(0.5, Color::WHITE));
        assert_eq!(
            resolve(&doc, Paint::Server(NodeId::intern("g")), 1.0),
            Some(ResolvedPaint::Color(Color::WHITE))
        );
    }
}
