//! Scoped attribute state for the tree walk.
//!
//! One `Vec` per inheritable attribute. The top of a stack is the effective
//! value for the subtree being visited; an empty stack yields the initial
//! value. Transform and opacity stacks compose with their parent on push,
//! the others simply override.

use kurbo::Affine;
use vgr_core::{Color, FillRule, LineCap, LineJoin, Paint};

pub const DEFAULT_FILL: Paint = Paint::Color(Color::BLACK);
pub const DEFAULT_STROKE: Paint = Paint::None;
pub const DEFAULT_STROKE_WIDTH: f32 = 1.0;

/// Depth of every attribute stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackDepths {
    pub transform: usize,
    pub fill: usize,
    pub stroke: usize,
    pub fill_opacity: usize,
    pub stroke_opacity: usize,
    pub stroke_width: usize,
    pub line_cap: usize,
    pub line_join: usize,
    pub miter_limit: usize,
    pub fill_rule: usize,
}

impl StackDepths {
    pub fn total(&self) -> usize {
        self.transform
            + self.fill
            + self.stroke
            + self.fill_opacity
            + self.stroke_opacity
            + self.stroke_width
            + self.line_cap
            + self.line_join
            + self.miter_limit
            + self.fill_rule
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Owned stack storage. Moves in and out of a renderer so allocations are
/// reused from one frame to the next.
#[derive(Debug, Clone, Default)]
pub struct AttributeStacks {
    transform: Vec<Affine>,
    fill: Vec<Paint>,
    stroke: Vec<Paint>,
    fill_opacity: Vec<f32>,
    stroke_opacity: Vec<f32>,
    stroke_width: Vec<f32>,
    line_cap: Vec<LineCap>,
    line_join: Vec<LineJoin>,
    miter_limit: Vec<f32>,
    fill_rule: Vec<FillRule>,
}

/// Clamp to 0..1, NaN counts as fully transparent.
fn unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

fn pop<T>(stack: &mut Vec<T>, name: &str) {
    let popped = stack.pop();
    debug_assert!(popped.is_some(), "pop on empty {name} stack");
    if popped.is_none() {
        log::debug!("ignored pop on empty {name} stack");
    }
}

impl AttributeStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depths(&self) -> StackDepths {
        StackDepths {
            transform: self.transform.len(),
            fill: self.fill.len(),
            stroke: self.stroke.len(),
            fill_opacity: self.fill_opacity.len(),
            stroke_opacity: self.stroke_opacity.len(),
            stroke_width: self.stroke_width.len(),
            line_cap: self.line_cap.len(),
            line_join: self.line_join.len(),
            miter_limit: self.miter_limit.len(),
            fill_rule: self.fill_rule.len(),
        }
    }

    /// Empty every stack, keeping capacity.
    pub fn clear(&mut self) {
        self.transform.clear();
        self.fill.clear();
        self.stroke.clear();
        self.fill_opacity.clear();
        self.stroke_opacity.clear();
        self.stroke_width.clear();
        self.line_cap.clear();
        self.line_join.clear();
        self.miter_limit.clear();
        self.fill_rule.clear();
    }

    // ─── Effective values ────────────────────────────────────────────────

    pub fn transform(&self) -> Affine {
        self.transform.last().copied().unwrap_or(Affine::IDENTITY)
    }

    pub fn fill(&self) -> Paint {
        self.fill.last().copied().unwrap_or(DEFAULT_FILL)
    }

    pub fn stroke(&self) -> Paint {
        self.stroke.last().copied().unwrap_or(DEFAULT_STROKE)
    }

    pub fn fill_opacity(&self) -> f32 {
        self.fill_opacity.last().copied().unwrap_or(1.0)
    }

    pub fn stroke_opacity(&self) -> f32 {
        self.stroke_opacity.last().copied().unwrap_or(1.0)
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width.last().copied().unwrap_or(DEFAULT_STROKE_WIDTH)
    }

    pub fn line_cap(&self) -> LineCap {
        self.line_cap.last().copied().unwrap_or_default()
    }

    pub fn line_join(&self) -> LineJoin {
        self.line_join.last().copied().unwrap_or_default()
    }

    /// Miter limit, or `default` when nothing overrides it.
    pub fn miter_limit(&self, default: f32) -> f32 {
        self.miter_limit.last().copied().unwrap_or(default)
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule.last().copied().unwrap_or_default()
    }

    // ─── Push / pop ──────────────────────────────────────────────────────

    /// Push `parent ∘ m`: `m` maps child coordinates into the parent's.
    pub fn push_transform(&mut self, m: Affine) {
        let top = self.transform() * m;
        self.transform.push(top);
    }

    pub fn pop_transform(&mut self) {
        pop(&mut self.transform, "transform");
    }

    pub fn push_fill(&mut self, paint: Paint) {
        self.fill.push(paint);
    }

    pub fn pop_fill(&mut self) {
        pop(&mut self.fill, "fill");
    }

    pub fn push_stroke(&mut self, paint: Paint) {
        self.stroke.push(paint);
    }

    pub fn pop_stroke(&mut self) {
        pop(&mut self.stroke, "stroke");
    }

    /// Push `v × parent`, `v` clamped to 0..1.
    pub fn push_fill_opacity(&mut self, v: f32) {
        let top = unit(v) * self.fill_opacity();
        self.fill_opacity.push(top);
    }

    pub fn pop_fill_opacity(&mut self) {
        pop(&mut self.fill_opacity, "fill-opacity");
    }

    /// Push `v × parent`, `v` clamped to 0..1.
    pub fn push_stroke_opacity(&mut self, v: f32) {
        let top = unit(v) * self.stroke_opacity();
        self.stroke_opacity.push(top);
    }

    pub fn pop_stroke_opacity(&mut self) {
        pop(&mut self.stroke_opacity, "stroke-opacity");
    }

    /// Negative or NaN widths push zero, which disables stroking.
    pub fn push_stroke_width(&mut self, width: f32) {
        self.stroke_width
            .push(if width.is_nan() { 0.0 } else { width.max(0.0) });
    }

    pub fn pop_stroke_width(&mut self) {
        pop(&mut self.stroke_width, "stroke-width");
    }

    pub fn push_line_cap(&mut self, cap: LineCap) {
        self.line_cap.push(cap);
    }

    pub fn pop_line_cap(&mut self) {
        pop(&mut self.line_cap, "line-cap");
    }

    pub fn push_line_join(&mut self, join: LineJoin) {
        self.line_join.push(join);
    }

    pub fn pop_line_join(&mut self) {
        pop(&mut self.line_join, "line-join");
    }

    pub fn push_miter_limit(&mut self, limit: f32) {
        self.miter_limit.push(limit);
    }

    pub fn pop_miter_limit(&mut self) {
        pop(&mut self.miter_limit, "miter-limit");
    }

    pub fn push_fill_rule(&mut self, rule: FillRule) {
        self.fill_rule.push(rule);
    }

    pub fn pop_fill_rule(&mut self) {
        pop(&mut self.fill_rule, "fill-rule");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn empty_stacks_yield_initial_values() {
        let stacks = AttributeStacks::new();
        assert_eq!(stacks.transform(), Affine::IDENTITY);
        assert_eq!(stacks.fill(), Paint::Color(Color::BLACK));
        assert_eq!(stacks.stroke(), Paint::None);
        assert_eq!(stacks.fill_opacity(), 1.0);
        assert_eq!(stacks.stroke_width(), 1.0);
        assert_eq!(stacks.line_cap(), LineCap::Butt);
        assert_eq!(stacks.line_join(), LineJoin::Miter);
        assert_eq!(stacks.miter_limit(4.0), 4.0);
        assert_eq!(stacks.fill_rule(), FillRule::NonZero);
        assert!(stacks.depths().is_empty());
    }

    #[test]
    fn transforms_compose_parent_first() {
        let mut stacks = AttributeStacks::new();
        stacks.push_transform(Affine::translate((10.0, 0.0)));
        stacks.push_transform(Affine::scale(2.0));
        // Child scale applies before parent translation.
        assert_eq!(stacks.transform() * Point::new(1.0, 1.0), Point::new(12.0, 2.0));
        stacks.pop_transform();
        assert_eq!(stacks.transform() * Point::new(1.0, 1.0), Point::new(11.0, 1.0));
    }

    #[test]
    fn opacity_multiplies_and_clamps() {
        let mut stacks = AttributeStacks::new();
        stacks.push_fill_opacity(0.5);
        stacks.push_fill_opacity(0.5);
        assert_eq!(stacks.fill_opacity(), 0.25);
        stacks.push_fill_opacity(3.0);
        assert_eq!(stacks.fill_opacity(), 0.25);
        stacks.push_stroke_opacity(f32::NAN);
        assert_eq!(stacks.stroke_opacity(), 0.0);
        stacks.pop_fill_opacity();
        stacks.pop_fill_opacity();
        assert_eq!(stacks.fill_opacity(), 0.5);
    }

    #[test]
    fn overrides_restore_on_pop() {
        let mut stacks = AttributeStacks::new();
        stacks.push_stroke(Paint::Color(Color::WHITE));
        stacks.push_stroke(Paint::None);
        assert_eq!(stacks.stroke(), Paint::None);
        stacks.pop_stroke();
        assert_eq!(stacks.stroke(), Paint::Color(Color::WHITE));

        stacks.push_stroke_width(-2.0);
        assert_eq!(stacks.stroke_width(), 0.0);
        assert_eq!(stacks.depths().total(), 2);
    }

    #[test]
    fn clear_empties_everything() {
        let mut stacks = AttributeStacks::new();
        stacks.push_fill_rule(FillRule::EvenOdd);
        stacks.push_miter_limit(8.0);
        stacks.push_line_cap(LineCap::Round);
        stacks.clear();
        assert_eq!(stacks.depths(), StackDepths::default());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "pop on empty fill stack")]
    fn pop_on_empty_stack_asserts() {
        AttributeStacks::new().pop_fill();
    }
}
