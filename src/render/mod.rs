//! Rasterization of sanitized documents.
//!
//! The primary path parses with usvg and renders through resvg. If that
//! fails (malformed path data, unsupported feature), a reduced-fidelity
//! fallback rebuilds a bare-strokes SVG from the document's path data and
//! renders that instead - a primary-path failure is recoverable, not
//! fatal, and is logged with the code for later inspection.

pub mod encode;

use crate::error::PipelineError;
use crate::log;
use crate::sanitize::{SanitizedDocument, stroke_paths};
use resvg::tiny_skia;
use std::sync::{Arc, LazyLock};

// System fonts are loaded once and shared across render calls; the numeral
// overlay uses SVG text elements that need a populated font database.
static FONTS: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
});

/// Rasterization options.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Target width in pixels.
    pub width: u32,
    /// Optional target height. Unset: fit-to-width preserving aspect.
    /// Set: fit-to-box with letterboxing.
    pub height: Option<u32>,
    /// Background fill, flattened under the (transparent) vector source.
    pub background: (u8, u8, u8),
}

/// Render a sanitized document to a bitmap.
pub fn render(
    doc: &SanitizedDocument,
    opts: &RenderOptions,
    code: &str,
) -> Result<tiny_skia::Pixmap, PipelineError> {
    match render_tree(doc.text.as_bytes(), opts) {
        Ok(pixmap) => Ok(pixmap),
        Err(primary_err) => {
            log!("render"; "primary render failed for {}: {} - falling back", code, primary_err);
            let minimal = bare_strokes_svg(doc);
            render_tree(minimal.as_bytes(), opts).map_err(|fallback_err| {
                PipelineError::RenderFailure {
                    code: code.to_string(),
                    reason: format!("primary: {primary_err}; fallback: {fallback_err}"),
                }
            })
        }
    }
}

/// Parse and rasterize one SVG byte buffer.
fn render_tree(data: &[u8], opts: &RenderOptions) -> Result<tiny_skia::Pixmap, String> {
    let options = usvg::Options {
        fontdb: FONTS.clone(),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_data(data, &options).map_err(|e| format!("SVG parse: {e}"))?;

    let size = tree.size();
    let (src_w, src_h) = (size.width(), size.height());
    if src_w <= 0.0 || src_h <= 0.0 {
        return Err(format!("degenerate source size {src_w}x{src_h}"));
    }

    let out_w = opts.width.max(1);
    let (out_h, scale, tx, ty) = match opts.height {
        // Fit-to-width: height follows the aspect ratio
        None => {
            let scale = out_w as f32 / src_w;
            let out_h = ((src_h * scale).round() as u32).max(1);
            (out_h, scale, 0.0, 0.0)
        }
        // Fit-to-box: letterbox into the requested box
        Some(h) => {
            let out_h = h.max(1);
            let scale = (out_w as f32 / src_w).min(out_h as f32 / src_h);
            let tx = (out_w as f32 - src_w * scale) / 2.0;
            let ty = (out_h as f32 - src_h * scale) / 2.0;
            (out_h, scale, tx, ty)
        }
    };

    let mut pixmap =
        tiny_skia::Pixmap::new(out_w, out_h).ok_or_else(|| "pixmap allocation failed".to_string())?;

    let (r, g, b) = opts.background;
    pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));

    let transform = tiny_skia::Transform::from_scale(scale, scale).post_translate(tx, ty);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(pixmap)
}

/// Rebuild a minimal SVG of bare stroke paths with fixed styling.
///
/// Drops everything but each stroke's path data, which sidesteps the
/// attribute or style constructs that broke the primary parse.
fn bare_strokes_svg(doc: &SanitizedDocument) -> String {
    let view_box = doc.view_box.as_deref().unwrap_or("0 0 109 109");
    let mut out = String::with_capacity(doc.text.len());
    out.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{view_box}\">"
    ));
    for d in stroke_paths(&doc.text) {
        out.push_str(&format!(
            "<path d=\"{d}\" fill=\"none\" stroke=\"#000000\" \
             stroke-width=\"3\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/>"
        ));
    }
    out.push_str("</svg>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::CharacterCode;
    use crate::sanitize::sanitize;

    fn doc() -> SanitizedDocument {
        let raw = r#"<svg xmlns="http://www.w3.org/2000/svg" width="109" height="109" viewBox="0 0 109 109">
<g style="fill:none;stroke:#000000;stroke-width:3">
<path d="M33.25,17.5c-0.73,1.2-1.5,2.4-2.2,3.1"/>
<path d="M12.5,34.23 L80,34.23"/>
</g>
</svg>"#;
        sanitize(raw, &CharacterCode::normalize("79c1").unwrap()).unwrap()
    }

    #[test]
    fn test_fit_to_width_preserves_aspect() {
        let opts = RenderOptions {
            width: 300,
            height: None,
            background: (255, 255, 255),
        };
        let pixmap = render(&doc(), &opts, "79c1").unwrap();
        assert_eq!(pixmap.width(), 300);
        assert_eq!(pixmap.height(), 300); // square source
    }

    #[test]
    fn test_fit_to_box_letterboxes() {
        let opts = RenderOptions {
            width: 400,
            height: Some(200),
            background: (0, 0, 0),
        };
        let pixmap = render(&doc(), &opts, "79c1").unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (400, 200));
    }

    #[test]
    fn test_background_is_flattened() {
        let opts = RenderOptions {
            width: 64,
            height: None,
            background: (255, 0, 0),
        };
        let pixmap = render(&doc(), &opts, "79c1").unwrap();
        // Corner pixel is pure background
        let pixel = pixmap.pixel(0, 0).unwrap();
        assert_eq!((pixel.red(), pixel.green(), pixel.blue()), (255, 0, 0));
        assert_eq!(pixel.alpha(), 255);
    }

    #[test]
    fn test_fallback_recovers_bare_strokes() {
        let mut broken = doc();
        // Zero-size root makes the primary parse fail while the path data
        // stays extractable for the fallback
        broken.text = broken
            .text
            .replace(r#"width="109" height="109""#, r#"width="0" height="0""#);
        let opts = RenderOptions {
            width: 64,
            height: None,
            background: (255, 255, 255),
        };
        let pixmap = render(&broken, &opts, "79c1").unwrap();
        assert_eq!(pixmap.width(), 64);
    }

    #[test]
    fn test_bare_strokes_svg_keeps_path_data() {
        let minimal = bare_strokes_svg(&doc());
        assert_eq!(minimal.matches("<path").count(), 2);
        assert!(minimal.contains("M33.25,17.5"));
        assert!(minimal.contains("viewBox=\"0 0 109 109\""));
    }
}
