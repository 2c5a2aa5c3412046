pub mod canvas;
pub mod paint;
mod path;
pub mod recording;
pub mod renderer;
pub mod scene;
pub mod shape;
pub mod stacks;

pub use canvas::{
    ArcDirection, Canvas, CanvasPaint, GradientShape, Viewport, Winding, average_scale,
};
pub use paint::ResolvedPaint;
pub use recording::{CanvasOp, DrawCall, DrawKind, RecordedPaint, RecordingCanvas};
pub use renderer::{RenderOptions, SvgRenderer, draw_document};
pub use scene::VelloCanvas;
pub use stacks::{AttributeStacks, StackDepths};
