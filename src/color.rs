use std::collections::BTreeMap;

use crate::{
    error::{OverprintError, OverprintResult},
    options::TextColor,
};

/// Sample grid the source image is reduced to before histogramming.
const SAMPLE_DIM: u32 = 50;
/// Quantization step applied to each channel when bucketing.
const QUANT_STEP: u32 = 32;
/// How many of the most frequent buckets are considered as candidates.
const TOP_BUCKETS: usize = 10;
/// Minimum saturation for a bucket to count as an accent.
const MIN_SATURATION: f64 = 0.2;
/// WCAG AA contrast floor required before an accent may be used as text fill.
const CONTRAST_FLOOR: f64 = 4.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A candidate accent color together with the metrics it was ranked by.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ColorInfo {
    pub hex: String,
    pub rgb: Rgb8,
    pub saturation: f64,
    pub luminance: f64,
}

impl ColorInfo {
    fn from_rgb(rgb: Rgb8) -> Self {
        Self {
            hex: rgb.hex(),
            rgb,
            saturation: saturation(rgb),
            luminance: relative_luminance(rgb),
        }
    }
}

/// Parse a `#rrggbb` hex string (case-insensitive, `#` optional).
pub fn parse_hex(s: &str) -> OverprintResult<Rgb8> {
    let t = s.trim();
    let t = t.strip_prefix('#').unwrap_or(t);
    if t.len() != 6 {
        return Err(OverprintError::validation(format!(
            "hex color must be #rrggbb, got \"{s}\""
        )));
    }

    let byte = |pair: &str| {
        u8::from_str_radix(pair, 16)
            .map_err(|_| OverprintError::validation(format!("invalid hex byte \"{pair}\"")))
    };

    Ok(Rgb8 {
        r: byte(&t[0..2])?,
        g: byte(&t[2..4])?,
        b: byte(&t[4..6])?,
    })
}

/// Extract a dominant, sufficiently saturated accent color from encoded image
/// bytes.
///
/// Returns `Ok(None)` when every dominant bucket is near-black, near-white or
/// near-gray; malformed image bytes are an error.
pub fn extract_accent_color(bytes: &[u8]) -> OverprintResult<Option<ColorInfo>> {
    let decoded = crate::decode::decode_image(bytes)?;
    Ok(accent_from_image(&decoded.rgba8))
}

/// Histogram-based accent extraction over an already decoded image.
pub fn accent_from_image(img: &image::RgbaImage) -> Option<ColorInfo> {
    struct Bucket {
        count: u64,
        sum_r: u64,
        sum_g: u64,
        sum_b: u64,
    }

    let small = image::imageops::resize(
        img,
        SAMPLE_DIM,
        SAMPLE_DIM,
        image::imageops::FilterType::Triangle,
    );

    // BTreeMap keeps ranking ties deterministic across runs.
    let mut buckets: BTreeMap<(u8, u8, u8), Bucket> = BTreeMap::new();
    for px in small.pixels() {
        let [r, g, b, a] = px.0;
        if a == 0 {
            continue;
        }
        let q = |c: u8| ((u32::from(c) / QUANT_STEP) * QUANT_STEP) as u8;
        let entry = buckets.entry((q(r), q(g), q(b))).or_insert(Bucket {
            count: 0,
            sum_r: 0,
            sum_g: 0,
            sum_b: 0,
        });
        entry.count += 1;
        entry.sum_r += u64::from(r);
        entry.sum_g += u64::from(g);
        entry.sum_b += u64::from(b);
    }

    let mut ranked: Vec<Bucket> = buckets.into_values().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_BUCKETS);

    let mut best: Option<ColorInfo> = None;
    for bucket in ranked {
        // Average of the actual (non-quantized) member pixels, so the result
        // is not snapped to the coarse bucket grid.
        let avg = Rgb8 {
            r: (bucket.sum_r / bucket.count) as u8,
            g: (bucket.sum_g / bucket.count) as u8,
            b: (bucket.sum_b / bucket.count) as u8,
        };

        let hi = avg.r.max(avg.g).max(avg.b);
        let lo = avg.r.min(avg.g).min(avg.b);
        let near_black = hi < 30;
        let near_white = lo > 225;
        let near_gray = hi - lo < 20;
        if near_black || near_white || near_gray {
            continue;
        }

        let sat = saturation(avg);
        if sat <= MIN_SATURATION {
            continue;
        }
        if best.as_ref().is_none_or(|b| sat > b.saturation) {
            best = Some(ColorInfo::from_rgb(avg));
        }
    }
    best
}

/// WCAG 2.x relative luminance in `[0, 1]`.
pub fn relative_luminance(rgb: Rgb8) -> f64 {
    fn linearize(c: u8) -> f64 {
        let c = f64::from(c) / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * linearize(rgb.r) + 0.7152 * linearize(rgb.g) + 0.0722 * linearize(rgb.b)
}

/// WCAG contrast ratio `(L_light + 0.05) / (L_dark + 0.05)`, in `[1, 21]`.
pub fn contrast_ratio(a: Rgb8, b: Rgb8) -> f64 {
    let la = relative_luminance(a);
    let lb = relative_luminance(b);
    (la.max(lb) + 0.05) / (la.min(lb) + 0.05)
}

/// Pick the most readable caption fill for a given background.
///
/// The accent wins only when it clears the AA floor and reads at least as
/// well as both black and white; otherwise whichever of black/white has the
/// higher contrast is chosen.
pub fn best_text_color(background: Rgb8, accent: Option<Rgb8>) -> TextColor {
    let vs_white = contrast_ratio(background, Rgb8::WHITE);
    let vs_black = contrast_ratio(background, Rgb8::BLACK);

    if let Some(accent) = accent {
        let vs_accent = contrast_ratio(background, accent);
        if vs_accent >= CONTRAST_FLOOR && vs_accent >= vs_white && vs_accent >= vs_black {
            return TextColor::Accent;
        }
    }

    if vs_black > vs_white {
        TextColor::Black
    } else {
        TextColor::White
    }
}

fn saturation(rgb: Rgb8) -> f64 {
    let hi = rgb.r.max(rgb.g).max(rgb.b);
    if hi == 0 {
        return 0.0;
    }
    let lo = rgb.r.min(rgb.g).min(rgb.b);
    f64::from(hi - lo) / f64::from(hi)
}
