#![forbid(unsafe_code)]

pub mod blend;
pub mod color;
pub mod crop;
pub mod decode;
pub mod error;
pub mod export;
pub mod layout;
pub mod options;
pub mod overlay;

pub use color::{ColorInfo, Rgb8, best_text_color, contrast_ratio, extract_accent_color};
pub use crop::{CropRect, resolve_crop};
pub use decode::{DecodedImage, decode_image, encode_jpeg};
pub use error::{OverprintError, OverprintResult};
pub use export::{
    BatchItem, EXPORT_ASPECT, JPEG_QUALITY, composite_for_export, composite_many,
    composite_with_aspect,
};
pub use layout::render_caption_overlay;
pub use options::{AspectRatio, OverlayOptions, OverlayPatch, TextAlign, TextColor};
