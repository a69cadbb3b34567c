use anyhow::Context;

use crate::error::{OverprintError, OverprintResult};

/// Upper bound on overlay raster dimensions. Exports past this are almost
/// certainly caller bugs and would allocate pathological pixmaps.
const MAX_DIM: u32 = 16_384;

/// Parse an SVG overlay document into a render tree.
pub fn parse_overlay(svg: &str) -> OverprintResult<usvg::Tree> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_str(svg, &opts).context("parse overlay svg")?;
    Ok(tree)
}

/// Rasterize an overlay tree to a premultiplied RGBA8 buffer of exactly
/// `width` x `height` pixels.
pub fn rasterize_overlay(tree: &usvg::Tree, width: u32, height: u32) -> OverprintResult<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(OverprintError::geometry("overlay raster size must be > 0"));
    }
    if width > MAX_DIM || height > MAX_DIM {
        return Err(OverprintError::geometry(format!(
            "overlay raster size too large: {width}x{height} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| OverprintError::render("failed to allocate overlay pixmap"))?;

    // The overlay is emitted at raster size already; the scale corrects any
    // sub-pixel mismatch between tree size and the requested pixmap.
    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap.data().to_vec())
}
