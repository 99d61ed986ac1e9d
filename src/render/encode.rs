//! Bitmap encoding to the final asset format.

use crate::config::OutputFormat;
use crate::error::PipelineError;
use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use resvg::tiny_skia;
use std::io::Cursor;

/// Encode a rendered pixmap to compressed image bytes.
///
/// `quality` applies to lossy formats only; WebP and PNG are lossless.
pub fn encode(
    pixmap: &tiny_skia::Pixmap,
    format: OutputFormat,
    quality: u8,
    code: &str,
) -> Result<Vec<u8>, PipelineError> {
    run(pixmap, format, quality).map_err(|e| PipelineError::EncodeFailure {
        code: code.to_string(),
        reason: format!("{e:#}"),
    })
}

fn run(pixmap: &tiny_skia::Pixmap, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    let rgba = to_rgba(pixmap).context("pixmap to RGBA conversion")?;
    let (width, height) = (rgba.width(), rgba.height());

    let mut out = Cursor::new(Vec::new());
    match format {
        OutputFormat::Webp => {
            WebPEncoder::new_lossless(&mut out)
                .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                .context("WebP encoding")?;
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut out)
                .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                .context("PNG encoding")?;
        }
        OutputFormat::Jpg => {
            // JPEG has no alpha channel; the pixmap is already flattened
            let rgb = image::DynamicImage::ImageRgba8(rgba).into_rgb8();
            JpegEncoder::new_with_quality(&mut out, quality)
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .context("JPEG encoding")?;
        }
    }

    Ok(out.into_inner())
}

/// Demultiply tiny-skia's premultiplied RGBA into a straight-alpha buffer.
fn to_rgba(pixmap: &tiny_skia::Pixmap) -> Result<RgbaImage> {
    let mut data = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .context("pixel buffer size mismatch")
}
