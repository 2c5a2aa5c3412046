//! Value types for vector documents: colors, paints, gradients, styles and
//! the tagged node variants.
//!
//! Everything here is plain data. A node's `Style` holds only what the node
//! itself declares; inheritance is resolved by the renderer while it walks
//! the tree, never stored on the node.

use crate::id::NodeId;
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape, SvgArc, Vec2};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

// ─── Colors ──────────────────────────────────────────────────────────────

/// Straight-alpha RGBA color, 4 × f32 in [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Parse `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let nibble = |i: usize| hex_val(bytes[i]).map(|v| v * 17);
        let byte = |i: usize| Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?);

        match bytes.len() {
            3 => Some(Self::rgba8(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
            4 => Some(Self::rgba8(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
            6 => Some(Self::rgba8(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Self::rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    /// CSS `rgba()` form, used by string-styled canvases.
    pub fn to_css(&self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("rgba({r}, {g}, {b}, {})", self.a.clamp(0.0, 1.0))
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Scale alpha by `factor` (clamped to 0..1).
    #[must_use]
    pub fn with_alpha_factor(self, factor: f32) -> Self {
        Self {
            a: self.a * factor.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex color `{s}`")))
    }
}

// ─── Paint ───────────────────────────────────────────────────────────────

/// A fill or stroke paint as declared on a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Paint {
    /// `none`: the attribute is explicitly switched off.
    None,
    Color(Color),
    /// Reference to a gradient in the document's paint-server table.
    Server(NodeId),
}

impl Paint {
    pub fn is_none(&self) -> bool {
        matches!(self, Paint::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

// ─── Gradients ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32, // 0.0 .. 1.0
    pub color: Color,
}

/// Coordinate system of a gradient's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientUnits {
    /// Geometry is in the user space of the element being painted.
    UserSpaceOnUse,
    /// Geometry is in the unit square mapped onto the element's bounding box.
    #[default]
    ObjectBoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GradientKind {
    Linear { start: Point, end: Point },
    Radial { center: Point, radius: f64 },
}

/// A paint server, referenced from styles through [`Paint::Server`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    #[serde(flatten)]
    pub kind: GradientKind,
    pub stops: SmallVec<[GradientStop; 4]>,
    #[serde(default)]
    pub units: GradientUnits,
    #[serde(default = "identity", skip_serializing_if = "is_identity")]
    pub transform: Affine,
}

fn identity() -> Affine {
    Affine::IDENTITY
}

fn is_identity(affine: &Affine) -> bool {
    *affine == Affine::IDENTITY
}

impl Gradient {
    pub fn linear(start: impl Into<Point>, end: impl Into<Point>) -> Self {
        Self {
            kind: GradientKind::Linear {
                start: start.into(),
                end: end.into(),
            },
            stops: SmallVec::new(),
            units: GradientUnits::UserSpaceOnUse,
            transform: Affine::IDENTITY,
        }
    }

    pub fn radial(center: impl Into<Point>, radius: f64) -> Self {
        Self {
            kind: GradientKind::Radial {
                center: center.into(),
                radius,
            },
            stops: SmallVec::new(),
            units: GradientUnits::UserSpaceOnUse,
            transform: Affine::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_stop(mut self, offset: f32, color: Color) -> Self {
        self.stops.push(GradientStop { offset, color });
        self
    }

    #[must_use]
    pub fn with_units(mut self, units: GradientUnits) -> Self {
        self.units = units;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }
}

// ─── Style ───────────────────────────────────────────────────────────────

/// Attributes a node declares itself. `None` means "inherit".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_opacity: Option<f32>,
    /// Element opacity. Without layer compositing this multiplies into
    /// both fill and stroke opacity of the element and its descendants.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_cap: Option<LineCap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_join: Option<LineJoin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miter_limit: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_rule: Option<FillRule>,
}

impl Style {
    pub fn is_empty(&self) -> bool {
        *self == Style::default()
    }

    #[must_use]
    pub fn fill(mut self, paint: Paint) -> Self {
        self.fill = Some(paint);
        self
    }

    #[must_use]
    pub fn stroke(mut self, paint: Paint) -> Self {
        self.stroke = Some(paint);
        self
    }

    #[must_use]
    pub fn fill_opacity(mut self, opacity: f32) -> Self {
        self.fill_opacity = Some(opacity);
        self
    }

    #[must_use]
    pub fn stroke_opacity(mut self, opacity: f32) -> Self {
        self.stroke_opacity = Some(opacity);
        self
    }

    #[must_use]
    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    #[must_use]
    pub fn stroke_width(mut self, width: f32) -> Self {
        self.stroke_width = Some(width);
        self
    }

    #[must_use]
    pub fn line_cap(mut self, cap: LineCap) -> Self {
        self.line_cap = Some(cap);
        self
    }

    #[must_use]
    pub fn line_join(mut self, join: LineJoin) -> Self {
        self.line_join = Some(join);
        self
    }

    #[must_use]
    pub fn miter_limit(mut self, limit: f32) -> Self {
        self.miter_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn fill_rule(mut self, rule: FillRule) -> Self {
        self.fill_rule = Some(rule);
        self
    }
}

// ─── Path data ───────────────────────────────────────────────────────────

/// Elliptical arc segment, SVG `A` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcSegment {
    pub radii: Vec2,
    /// Rotation of the ellipse's x axis, in radians.
    #[serde(default)]
    pub x_rotation: f64,
    #[serde(default)]
    pub large_arc: bool,
    #[serde(default)]
    pub sweep: bool,
    pub end: Point,
}

impl ArcSegment {
    pub fn to_svg_arc(&self, from: Point) -> SvgArc {
        SvgArc {
            from,
            to: self.end,
            radii: self.radii,
            x_rotation: self.x_rotation,
            large_arc: self.large_arc,
            sweep: self.sweep,
        }
    }
}

/// One already-decomposed path segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSeg {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),          // control, end
    CubicTo(Point, Point, Point),  // c1, c2, end
    Arc(ArcSegment),
    Close,
}

/// Arc tolerance used when none is configured.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

const MIN_TOLERANCE: f64 = 1e-4;

/// Arc flattening tolerance that keeps cubic subdivision bounded.
///
/// Non-positive or NaN values fall back to [`DEFAULT_TOLERANCE`].
pub fn sanitize_tolerance(tolerance: f64) -> f64 {
    if tolerance.is_nan() || tolerance <= 0.0 {
        DEFAULT_TOLERANCE
    } else {
        tolerance.max(MIN_TOLERANCE)
    }
}

/// Subpath bookkeeping for [`replay_segments`].
#[derive(Default)]
struct Cursor {
    start: Point,
    current: Option<Point>,
    closed_at: Option<Point>,
}

impl Cursor {
    /// Current point, moving to the last closed start or `first` if none.
    fn open(&mut self, first: Point, emit: &mut impl FnMut(PathEl)) -> Point {
        if let Some(p) = self.current {
            return p;
        }
        let p = self.closed_at.take().unwrap_or(first);
        self.move_to(p, emit);
        p
    }

    fn move_to(&mut self, p: Point, emit: &mut impl FnMut(PathEl)) {
        emit(PathEl::MoveTo(p));
        self.start = p;
        self.current = Some(p);
        self.closed_at = None;
    }
}

/// Replay a segment list as kurbo path elements, expanding arcs to cubics.
///
/// Output always forms valid subpaths: a drawing segment with no current
/// point first moves to the last closed subpath's start, or to its own
/// first point. `Close` without a current point is dropped.
pub fn replay_segments(segments: &[PathSeg], tolerance: f64, mut emit: impl FnMut(PathEl)) {
    let tolerance = sanitize_tolerance(tolerance);
    let mut cursor = Cursor::default();

    for seg in segments {
        match *seg {
            PathSeg::MoveTo(p) => cursor.move_to(p, &mut emit),
            PathSeg::LineTo(p) => {
                cursor.open(p, &mut emit);
                emit(PathEl::LineTo(p));
                cursor.current = Some(p);
            }
            PathSeg::QuadTo(c, p) => {
                cursor.open(c, &mut emit);
                emit(PathEl::QuadTo(c, p));
                cursor.current = Some(p);
            }
            PathSeg::CubicTo(c1, c2, p) => {
                cursor.open(c1, &mut emit);
                emit(PathEl::CurveTo(c1, c2, p));
                cursor.current = Some(p);
            }
            PathSeg::Arc(arc) => {
                let from = cursor.open(arc.end, &mut emit);
                match kurbo::Arc::from_svg_arc(&arc.to_svg_arc(from)) {
                    Some(a) => a.to_cubic_beziers(tolerance, |c1, c2, p| {
                        emit(PathEl::CurveTo(c1, c2, p));
                    }),
                    // Zero radius or coincident endpoints: a straight line.
                    None => emit(PathEl::LineTo(arc.end)),
                }
                cursor.current = Some(arc.end);
            }
            PathSeg::Close => {
                if cursor.current.take().is_some() {
                    emit(PathEl::ClosePath);
                    cursor.closed_at = Some(cursor.start);
                }
            }
        }
    }
}

/// Flatten a segment list into a kurbo path, expanding arcs to cubics.
pub fn segments_to_bez_path(segments: &[PathSeg], tolerance: f64) -> BezPath {
    let mut path = BezPath::new();
    replay_segments(segments, tolerance, |el| path.push(el));
    path
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// The node kinds of a document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Container; carries no geometry of its own.
    Group,
    Path { segments: Vec<PathSeg> },
    Polyline { points: Vec<Point> },
    Polygon { points: Vec<Point> },
    Line { start: Point, end: Point },
    Rect {
        rect: Rect,
        #[serde(default)]
        radius: f64,
    },
    Circle { center: Point, radius: f64 },
    Ellipse { center: Point, radii: Vec2 },
    /// Raster image reference. Not drawn.
    Image { href: String, rect: Rect },
    /// Positioned text run. Not drawn.
    TextSpan { text: String, position: Point },
}

impl NodeKind {
    /// Short lowercase name, also used as the prefix of generated ids.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Path { .. } => "path",
            NodeKind::Polyline { .. } => "polyline",
            NodeKind::Polygon { .. } => "polygon",
            NodeKind::Line { .. } => "line",
            NodeKind::Rect { .. } => "rect",
            NodeKind::Circle { .. } => "circle",
            NodeKind::Ellipse { .. } => "ellipse",
            NodeKind::Image { .. } => "image",
            NodeKind::TextSpan { .. } => "text_span",
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, NodeKind::Group)
    }

    /// Whether this kind produces fill/stroke geometry.
    pub fn is_shape(&self) -> bool {
        !matches!(
            self,
            NodeKind::Group | NodeKind::Image { .. } | NodeKind::TextSpan { .. }
        )
    }

    /// Geometric bounding box in the node's own user space.
    ///
    /// `None` for groups, text, and shapes with no points.
    pub fn bounding_box(&self) -> Option<Rect> {
        match self {
            NodeKind::Group | NodeKind::TextSpan { .. } => None,
            NodeKind::Path { segments } => {
                let path = segments_to_bez_path(segments, DEFAULT_TOLERANCE);
                if path.elements().is_empty() {
                    return None;
                }
                Some(path.bounding_box())
            }
            NodeKind::Polyline { points } | NodeKind::Polygon { points } => {
                let (first, rest) = points.split_first()?;
                Some(
                    rest.iter()
                        .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p)),
                )
            }
            NodeKind::Line { start, end } => Some(Rect::from_points(*start, *end)),
            NodeKind::Rect { rect, .. } => Some(rect.abs()),
            NodeKind::Image { rect, .. } => Some(rect.abs()),
            NodeKind::Circle { center, radius } => {
                let r = radius.abs();
                Some(Rect::new(center.x - r, center.y - r, center.x + r, center.y + r))
            }
            NodeKind::Ellipse { center, radii } => {
                let (rx, ry) = (radii.x.abs(), radii.y.abs());
                Some(Rect::new(center.x - rx, center.y - ry, center.x + rx, center.y + ry))
            }
        }
    }
}

/// A single element of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Own style overrides.
    pub style: Style,
    /// Local transform, interpreted in the parent's coordinate space.
    pub transform: Option<Affine>,
}

impl Node {
    /// A node with a generated id and no overrides.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::generated(kind.name()),
            kind,
            style: Style::default(),
            transform: None,
        }
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = NodeId::intern(id);
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = Some(transform);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing_variants() {
        assert_eq!(Color::from_hex("#000"), Some(Color::BLACK));
        assert_eq!(Color::from_hex("FFFFFF"), Some(Color::WHITE));
        let c = Color::from_hex("#FF000080").unwrap();
        assert_eq!(c.to_rgba8(), [255, 0, 0, 128]);
        assert_eq!(Color::from_hex("#12"), None);
        assert_eq!(Color::from_hex("#GGG"), None);
    }

    #[test]
    fn hex_emit_drops_opaque_alpha() {
        assert_eq!(Color::rgba8(255, 128, 0, 255).to_hex(), "#FF8000");
        assert_eq!(Color::rgba8(255, 128, 0, 64).to_hex(), "#FF800040");
    }

    #[test]
    fn alpha_factor_is_clamped() {
        let c = Color::WHITE.with_alpha_factor(0.25);
        assert_eq!(c.a, 0.25);
        assert_eq!(Color::WHITE.with_alpha_factor(4.0).a, 1.0);
        assert!(Color::WHITE.with_alpha_factor(-1.0).is_transparent());
    }

    #[test]
    fn circle_bounding_box() {
        let kind = NodeKind::Circle {
            center: Point::new(10.0, 20.0),
            radius: 5.0,
        };
        assert_eq!(kind.bounding_box(), Some(Rect::new(5.0, 15.0, 15.0, 25.0)));
    }

    #[test]
    fn polyline_bounding_box_covers_all_points() {
        let kind = NodeKind::Polyline {
            points: vec![
                Point::new(3.0, 4.0),
                Point::new(-1.0, 8.0),
                Point::new(6.0, 0.0),
            ],
        };
        assert_eq!(kind.bounding_box(), Some(Rect::new(-1.0, 0.0, 6.0, 8.0)));
        assert_eq!(NodeKind::Polygon { points: vec![] }.bounding_box(), None);
    }

    #[test]
    fn degenerate_arc_becomes_line() {
        let segments = [
            PathSeg::MoveTo(Point::new(0.0, 0.0)),
            PathSeg::Arc(ArcSegment {
                radii: Vec2::ZERO,
                x_rotation: 0.0,
                large_arc: false,
                sweep: true,
                end: Point::new(10.0, 0.0),
            }),
        ];
        let path = segments_to_bez_path(&segments, 0.1);
        let els: Vec<_> = path.elements().to_vec();
        assert_eq!(
            els,
            vec![
                kurbo::PathEl::MoveTo(Point::new(0.0, 0.0)),
                kurbo::PathEl::LineTo(Point::new(10.0, 0.0)),
            ]
        );
    }

    #[test]
    fn path_without_move_to_still_builds() {
        let segments = [PathSeg::LineTo(Point::new(5.0, 0.0)), PathSeg::Close];
        let path = segments_to_bez_path(&segments, DEFAULT_TOLERANCE);
        assert_eq!(
            path.elements(),
            &[
                kurbo::PathEl::MoveTo(Point::new(5.0, 0.0)),
                kurbo::PathEl::LineTo(Point::new(5.0, 0.0)),
                kurbo::PathEl::ClosePath,
            ]
        );
        let kind = NodeKind::Path {
            segments: vec![PathSeg::QuadTo(Point::new(0.0, 4.0), Point::new(6.0, 2.0))],
        };
        assert_eq!(kind.bounding_box(), Some(Rect::new(0.0, 2.0, 6.0, 4.0)));
    }

    #[test]
    fn close_only_path_has_no_bounds() {
        let kind = NodeKind::Path {
            segments: vec![PathSeg::Close],
        };
        assert_eq!(kind.bounding_box(), None);
    }

    #[test]
    fn tolerance_is_sanitized() {
        assert_eq!(sanitize_tolerance(0.25), 0.25);
        assert_eq!(sanitize_tolerance(0.0), DEFAULT_TOLERANCE);
        assert_eq!(sanitize_tolerance(-3.0), DEFAULT_TOLERANCE);
        assert_eq!(sanitize_tolerance(f64::NAN), DEFAULT_TOLERANCE);
        assert!(sanitize_tolerance(1e-300) >= 1e-4);
    }

    #[test]
    fn generated_ids_use_kind_name() {
        let node = Node::new(NodeKind::Line {
            start: Point::ZERO,
            end: Point::new(1.0, 1.0),
        });
        assert!(node.id.as_str().starts_with("_line_"));
    }
}
