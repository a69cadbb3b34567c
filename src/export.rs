use anyhow::Context;

use crate::{
    blend::over_in_place,
    color::{accent_from_image, parse_hex},
    crop::resolve_crop,
    decode::{decode_image, encode_jpeg},
    error::OverprintResult,
    layout::render_caption_overlay,
    options::{AspectRatio, OverlayOptions, OverlayPatch, TextColor},
    overlay::{parse_overlay, rasterize_overlay},
};

/// The portrait aspect used by the standard export path.
pub const EXPORT_ASPECT: AspectRatio = AspectRatio { w: 4, h: 5 };

/// Output encoding quality for exports.
pub const JPEG_QUALITY: u8 = 90;

/// Caption font sizes are authored against a 1080px short edge and scaled to
/// the actual output so text reads the same at any resolution.
const FONT_SCALE_REFERENCE: f64 = 1080.0;

/// One unit of work for [`composite_many`].
#[derive(Clone, Debug)]
pub struct BatchItem {
    pub image_bytes: Vec<u8>,
    pub caption: String,
    pub overrides: OverlayPatch,
}

/// Standard export: crop to 4:5 portrait, overlay the caption, encode JPEG.
pub fn composite_for_export(
    image_bytes: &[u8],
    caption: &str,
    options: &OverlayOptions,
) -> OverprintResult<Vec<u8>> {
    composite_with_aspect(image_bytes, caption, options, Some(EXPORT_ASPECT))
}

/// Generalized composite path. `aspect: None` skips cropping and overlays on
/// the full image.
///
/// Overlay coordinates (`x`, `y`, `width`) are interpreted relative to the
/// cropped image, not the source. A blank caption skips the overlay stage
/// entirely. All work happens over in-memory buffers; the caller owns every
/// bit of I/O.
pub fn composite_with_aspect(
    image_bytes: &[u8],
    caption: &str,
    options: &OverlayOptions,
    aspect: Option<AspectRatio>,
) -> OverprintResult<Vec<u8>> {
    options.validate()?;
    let opts = options.normalized();

    let decoded = decode_image(image_bytes)?;

    // Accent resolution is lazy: only when the caption will actually be drawn
    // in accent and the caller did not precompute one.
    let fill = if caption.trim().is_empty() {
        None
    } else {
        Some(resolve_fill(&opts, &decoded.rgba8))
    };

    let mut canvas = match aspect {
        Some(aspect) => {
            let rect = resolve_crop(
                decoded.width,
                decoded.height,
                aspect,
                opts.image_scale,
                opts.image_offset_x,
                opts.image_offset_y,
            )?;
            tracing::debug!(?rect, src_w = decoded.width, src_h = decoded.height, "resolved crop");
            image::imageops::crop_imm(&decoded.rgba8, rect.left, rect.top, rect.width, rect.height)
                .to_image()
        }
        None => decoded.rgba8,
    };

    if let Some(fill) = fill {
        let (cw, ch) = canvas.dimensions();

        let mut layout_opts = opts.clone();
        layout_opts.font_size *= f64::from(cw.min(ch)) / FONT_SCALE_REFERENCE;

        let svg = render_caption_overlay(caption, cw, ch, &layout_opts, &fill)?;
        let tree = parse_overlay(&svg)?;
        let overlay = rasterize_overlay(&tree, cw, ch)?;
        over_in_place(&mut canvas, &overlay)?;
    }

    encode_jpeg(&canvas, JPEG_QUALITY)
}

/// Composite a batch sequentially, preserving input order.
///
/// Per-item overrides are layered over the shared defaults. The first failing
/// item fails the whole batch; callers wanting partial tolerance invoke
/// [`composite_for_export`] per item and handle errors themselves.
#[tracing::instrument(skip(items, defaults), fields(items = items.len()))]
pub fn composite_many(
    items: &[BatchItem],
    defaults: &OverlayOptions,
) -> OverprintResult<Vec<Vec<u8>>> {
    let mut outputs = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let opts = item.overrides.apply(defaults);
        let out = composite_for_export(&item.image_bytes, &item.caption, &opts)
            .with_context(|| format!("composite batch item {i}"))?;
        outputs.push(out);
    }
    Ok(outputs)
}

fn resolve_fill(opts: &OverlayOptions, source: &image::RgbaImage) -> String {
    match opts.text_color {
        TextColor::Black => "#000000".to_string(),
        TextColor::White => "#ffffff".to_string(),
        TextColor::Accent => opts
            .accent_color
            .as_deref()
            .and_then(|hex| parse_hex(hex).ok())
            .map(|rgb| rgb.hex())
            .or_else(|| accent_from_image(source).map(|info| info.hex))
            .unwrap_or_else(|| "#ffffff".to_string()),
    }
}
