use crate::{
    error::{OverprintError, OverprintResult},
    options::AspectRatio,
};

/// Axis-aligned crop window in source-image pixel space.
///
/// Always fully contained in the source image it was resolved against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Resolve user pan/zoom plus a target aspect into an exact crop window.
///
/// `scale` 1 is the minimum zoom that covers the target aspect without
/// letterboxing; larger values shrink the window (more magnification on
/// output). Offsets are percentages of the available overflow in `[-50, 50]`,
/// 0 meaning centered. When an axis has no overflow, panning that axis is a
/// no-op. Degenerate inputs clamp instead of erroring: the result never
/// exceeds source bounds.
pub fn resolve_crop(
    src_w: u32,
    src_h: u32,
    aspect: AspectRatio,
    scale: f64,
    offset_x_pct: f64,
    offset_y_pct: f64,
) -> OverprintResult<CropRect> {
    if src_w == 0 || src_h == 0 {
        return Err(OverprintError::validation(
            "source dimensions must be > 0",
        ));
    }
    if !scale.is_finite() || !offset_x_pct.is_finite() || !offset_y_pct.is_finite() {
        return Err(OverprintError::validation(
            "scale and offsets must be finite",
        ));
    }

    let src_wf = f64::from(src_w);
    let src_hf = f64::from(src_h);
    let current = src_wf / src_hf;
    let target = aspect.as_f64();

    // Cover: trim the axis that overshoots the target aspect.
    let (mut crop_w, mut crop_h) = if current > target {
        (src_hf * target, src_hf)
    } else {
        (src_wf, src_wf / target)
    };

    let scale = scale.max(1.0);
    crop_w = (crop_w / scale).min(src_wf);
    crop_h = (crop_h / scale).min(src_hf);

    let overflow_x = src_wf - crop_w;
    let overflow_y = src_hf - crop_h;

    let off_x = offset_x_pct.clamp(-50.0, 50.0);
    let off_y = offset_y_pct.clamp(-50.0, 50.0);

    let left = (overflow_x / 2.0 + (off_x / 100.0) * overflow_x).clamp(0.0, overflow_x);
    let top = (overflow_y / 2.0 + (off_y / 100.0) * overflow_y).clamp(0.0, overflow_y);

    let width = (crop_w.round() as u32).clamp(1, src_w);
    let height = (crop_h.round() as u32).clamp(1, src_h);
    let left = (left.round() as u32).min(src_w - width);
    let top = (top.round() as u32).min(src_h - height);

    Ok(CropRect {
        left,
        top,
        width,
        height,
    })
}
