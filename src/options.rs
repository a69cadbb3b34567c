use crate::error::{OverprintError, OverprintResult};

/// Horizontal alignment of the caption block. Determines which edge of the
/// bounding box the text anchors to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Caption fill color. `Accent` resolves to an extracted accent color and
/// falls back to white when the source image has no usable accent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColor {
    Black,
    #[default]
    White,
    Accent,
}

/// Target output aspect as a `w:h` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AspectRatio {
    pub w: u32,
    pub h: u32,
}

impl AspectRatio {
    /// Create a validated aspect with both terms non-zero.
    pub fn new(w: u32, h: u32) -> OverprintResult<Self> {
        if w == 0 || h == 0 {
            return Err(OverprintError::validation("aspect terms must be > 0"));
        }
        Ok(Self { w, h })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.w) / f64::from(self.h)
    }
}

/// Caption placement, sizing and pan/zoom parameters for one composite call.
///
/// `x`/`y` position the text block's anchor as percentages of the output
/// image; `y` is the vertical center of the whole block, not the first
/// baseline. `image_scale`/`image_offset_*` drive the crop window:
/// scale 1 is the minimum zoom that fully covers the target aspect, offsets
/// pan within the leftover overflow.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayOptions {
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub width: f64,
    pub text_align: TextAlign,
    pub text_color: TextColor,
    pub accent_color: Option<String>,
    pub image_scale: f64,
    pub image_offset_x: f64,
    pub image_offset_y: f64,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            x: 50.0,
            y: 80.0,
            font_size: 34.0,
            width: 80.0,
            text_align: TextAlign::default(),
            text_color: TextColor::default(),
            accent_color: None,
            image_scale: 1.0,
            image_offset_x: 0.0,
            image_offset_y: 0.0,
        }
    }
}

impl OverlayOptions {
    pub fn validate(&self) -> OverprintResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(OverprintError::validation("font_size must be > 0"));
        }
        for (name, v) in [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("image_scale", self.image_scale),
            ("image_offset_x", self.image_offset_x),
            ("image_offset_y", self.image_offset_y),
        ] {
            if !v.is_finite() {
                return Err(OverprintError::validation(format!("{name} must be finite")));
            }
        }
        if let Some(hex) = &self.accent_color {
            crate::color::parse_hex(hex)?;
        }
        Ok(())
    }

    /// Clamp every percentage field into its documented range.
    ///
    /// The compositor runs this once up front; the text layout engine trusts
    /// the values it receives and does not reclamp.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        out.x = out.x.clamp(0.0, 100.0);
        out.y = out.y.clamp(0.0, 100.0);
        out.width = out.width.clamp(20.0, 100.0);
        out.image_scale = out.image_scale.max(1.0);
        out.image_offset_x = out.image_offset_x.clamp(-50.0, 50.0);
        out.image_offset_y = out.image_offset_y.clamp(-50.0, 50.0);
        out
    }
}

/// Per-item overrides layered over shared batch defaults. Unset fields keep
/// the default's value.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub font_size: Option<f64>,
    pub width: Option<f64>,
    pub text_align: Option<TextAlign>,
    pub text_color: Option<TextColor>,
    pub accent_color: Option<String>,
    pub image_scale: Option<f64>,
    pub image_offset_x: Option<f64>,
    pub image_offset_y: Option<f64>,
}

impl OverlayPatch {
    pub fn apply(&self, base: &OverlayOptions) -> OverlayOptions {
        OverlayOptions {
            x: self.x.unwrap_or(base.x),
            y: self.y.unwrap_or(base.y),
            font_size: self.font_size.unwrap_or(base.font_size),
            width: self.width.unwrap_or(base.width),
            text_align: self.text_align.unwrap_or(base.text_align),
            text_color: self.text_color.unwrap_or(base.text_color),
            accent_color: self.accent_color.clone().or_else(|| base.accent_color.clone()),
            image_scale: self.image_scale.unwrap_or(base.image_scale),
            image_offset_x: self.image_offset_x.unwrap_or(base.image_offset_x),
            image_offset_y: self.image_offset_y.unwrap_or(base.image_offset_y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize_from_empty_object() {
        let opts: OverlayOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, OverlayOptions::default());
        assert_eq!(opts.text_align, TextAlign::Center);
        assert_eq!(opts.text_color, TextColor::White);
    }

    #[test]
    fn enums_use_lowercase_wire_names() {
        let opts: OverlayOptions =
            serde_json::from_str(r#"{"text_align":"right","text_color":"accent"}"#).unwrap();
        assert_eq!(opts.text_align, TextAlign::Right);
        assert_eq!(opts.text_color, TextColor::Accent);
    }

    #[test]
    fn validate_rejects_bad_font_size_and_hex() {
        let mut opts = OverlayOptions {
            font_size: 0.0,
            ..OverlayOptions::default()
        };
        assert!(opts.validate().is_err());

        opts.font_size = 34.0;
        opts.accent_color = Some("not-a-color".to_string());
        assert!(opts.validate().is_err());

        opts.accent_color = Some("#ff8800".to_string());
        opts.validate().unwrap();
    }

    #[test]
    fn normalized_clamps_into_documented_ranges() {
        let opts = OverlayOptions {
            x: 140.0,
            y: -3.0,
            width: 5.0,
            image_scale: 0.25,
            image_offset_x: -90.0,
            image_offset_y: 75.0,
            ..OverlayOptions::default()
        };
        let n = opts.normalized();
        assert_eq!(n.x, 100.0);
        assert_eq!(n.y, 0.0);
        assert_eq!(n.width, 20.0);
        assert_eq!(n.image_scale, 1.0);
        assert_eq!(n.image_offset_x, -50.0);
        assert_eq!(n.image_offset_y, 50.0);
    }

    #[test]
    fn patch_overrides_only_set_fields() {
        let base = OverlayOptions::default();
        let patch = OverlayPatch {
            y: Some(20.0),
            text_color: Some(TextColor::Black),
            ..OverlayPatch::default()
        };
        let merged = patch.apply(&base);
        assert_eq!(merged.y, 20.0);
        assert_eq!(merged.text_color, TextColor::Black);
        assert_eq!(merged.x, base.x);
        assert_eq!(merged.font_size, base.font_size);
    }

    #[test]
    fn aspect_rejects_zero_terms() {
        assert!(AspectRatio::new(0, 5).is_err());
        assert!(AspectRatio::new(4, 0).is_err());
        let a = AspectRatio::new(4, 5).unwrap();
        assert!((a.as_f64() - 0.8).abs() < 1e-12);
    }
}
