//! Thumbnail rendering for committed artifacts.

use image::ImageFormat;
use std::io::Cursor;

/// Render a JPEG thumbnail bounded by `max_dim` on the longer edge,
/// preserving aspect ratio.
///
/// Returns `None` for uploads the decoder cannot rasterize (PDFs, corrupt
/// images); the record then commits without a thumbnail locator.
pub fn render_thumbnail(data: &[u8], max_dim: u32) -> Option<Vec<u8>> {
    let img = image::load_from_memory(data).ok()?;
    let thumb = img.thumbnail(max_dim, max_dim);

    // JPEG has no alpha channel; flatten before encoding.
    let rgb = image::DynamicImage::ImageRgb8(thumb.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg).ok()?;
    Some(out.into_inner())
}
