//! WASM bridge for vgr: loads a document and draws it into an HTML canvas.
//!
//! Built with `wasm-pack build --target web`.

mod canvas2d;

pub use canvas2d::Canvas2dCanvas;

use canvas2d::warn_on_err;

use kurbo::{Affine, Size};
use vgr_core::{Document, sanitize_tolerance};
use vgr_render::{AttributeStacks, Canvas, RenderOptions, SvgRenderer, Viewport};
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// A loaded document plus the stacks reused between frames.
#[wasm_bindgen]
pub struct SvgView {
    doc: Document,
    stacks: AttributeStacks,
    options: RenderOptions,
}

#[wasm_bindgen]
impl SvgView {
    /// Load a document from its JSON interchange form.
    #[wasm_bindgen(constructor)]
    pub fn new(json: &str) -> Result<SvgView, JsValue> {
        init_console();
        let doc = Document::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self::with_document(doc))
    }

    /// Load a document from MessagePack bytes.
    pub fn from_msgpack(bytes: &[u8]) -> Result<SvgView, JsValue> {
        init_console();
        let doc = Document::from_msgpack(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self::with_document(doc))
    }

    /// Draw one frame. `width` / `height` are in CSS pixels; the backing
    /// store is expected to be `pixel_ratio` times larger.
    pub fn render(
        &mut self,
        ctx: &CanvasRenderingContext2d,
        width: f64,
        height: f64,
        pixel_ratio: f64,
    ) {
        warn_on_err("setTransform", ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0));
        ctx.clear_rect(0.0, 0.0, width * pixel_ratio, height * pixel_ratio);

        let viewport = Viewport {
            width,
            height,
            pixel_ratio: pixel_ratio as f32,
        };
        let mut canvas = Canvas2dCanvas::new(ctx.clone());
        canvas.begin_frame(Size::new(width, height), viewport.pixel_ratio);
        canvas.set_transform(viewport.fit(self.doc.size));

        let stacks = std::mem::take(&mut self.stacks);
        let mut renderer =
            SvgRenderer::with_stacks(&mut canvas, stacks).with_options(self.options);
        renderer.render(&self.doc);
        self.stacks = renderer.into_stacks();

        canvas.reset_transform();
        canvas.end_frame();
    }

    /// Miter limit used for strokes that do not set one.
    pub fn set_miter_limit(&mut self, limit: f32) {
        self.options.miter_limit = limit;
    }

    /// Flattening tolerance for elliptical arcs in path data.
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.options.tolerance = sanitize_tolerance(tolerance);
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> f64 {
        self.doc.size.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> f64 {
        self.doc.size.height
    }

    #[wasm_bindgen(getter)]
    pub fn node_count(&self) -> usize {
        self.doc.len()
    }

    /// Serialize the loaded document back to JSON.
    pub fn to_json(&self) -> Result<String, JsValue> {
        self.doc.to_json().map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Affine that maps document space onto a `width` × `height` viewport,
    /// as `[a, b, c, d, e, f]`.
    pub fn fit_transform(&self, width: f64, height: f64) -> Vec<f64> {
        let viewport = Viewport {
            width,
            height,
            pixel_ratio: 1.0,
        };
        let xf: Affine = viewport.fit(self.doc.size);
        xf.as_coeffs().to_vec()
    }
}

impl SvgView {
    fn with_document(doc: Document) -> Self {
        log::debug!("loaded document with {} nodes", doc.len());
        Self {
            doc,
            stacks: AttributeStacks::new(),
            options: RenderOptions::default(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}

// ─── Console plumbing ────────────────────────────────────────────────────

fn init_console() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("vgr WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
            if log::set_logger(&ConsoleLogger).is_ok() {
                log::set_max_level(log::LevelFilter::Info);
            }
        });
    }
}

/// Forwards `log` records to the browser console.
#[cfg(target_arch = "wasm32")]
struct ConsoleLogger;

#[cfg(target_arch = "wasm32")]
impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            log::Level::Info => web_sys::console::info_1(&msg),
            _ => web_sys::console::log_1(&msg),
        }
    }

    fn flush(&self) {}
}

// ─── Standalone validation (no canvas needed) ────────────────────────────

/// Validate a JSON document. Returns `{"ok":true,"nodes":N}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(json: &str) -> String {
    let result = match Document::from_json(json) {
        Ok(doc) => serde_json::json!({ "ok": true, "nodes": doc.len() }),
        Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }),
    };
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BADGE: &str = include_str!("../../vgr-core/tests/fixtures/badge.json");

    #[test]
    fn validate_accepts_fixture() {
        let out: serde_json::Value = serde_json::from_str(&validate(BADGE)).unwrap();
        assert_eq!(out["ok"], true);
        assert!(out["nodes"].as_u64().unwrap() > 1);
    }

    #[test]
    fn validate_reports_errors_as_json() {
        let out: serde_json::Value = serde_json::from_str(&validate("{\"size\": ")).unwrap();
        assert_eq!(out["ok"], false);
        assert!(out["error"].as_str().unwrap().contains("JSON"));
    }

    #[test]
    fn fit_transform_centers_document() {
        let view = SvgView::with_document(Document::new(Size::new(100.0, 50.0)));
        assert_eq!(
            view.fit_transform(200.0, 200.0),
            vec![2.0, 0.0, 0.0, 2.0, 0.0, 50.0]
        );
    }
}
