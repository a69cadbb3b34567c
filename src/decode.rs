use std::io::Cursor;

use anyhow::Context;

use crate::error::{OverprintError, OverprintResult};

/// A decoded raster held as straight-alpha RGBA8.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8: image::RgbaImage,
}

/// Decode any raster format the `image` crate recognizes.
pub fn decode_image(bytes: &[u8]) -> OverprintResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba8 = dyn_img.to_rgba8();
    let (width, height) = rgba8.dimensions();
    Ok(DecodedImage {
        width,
        height,
        rgba8,
    })
}

/// Encode to JPEG at the given quality, flattening alpha.
pub fn encode_jpeg(rgba: &image::RgbaImage, quality: u8) -> OverprintResult<Vec<u8>> {
    if quality == 0 || quality > 100 {
        return Err(OverprintError::validation("jpeg quality must be in 1..=100"));
    }

    let rgb = image::DynamicImage::ImageRgba8(rgba.clone()).to_rgb8();
    let mut out = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut out), quality);
    encoder.encode_image(&rgb).context("encode jpeg")?;
    Ok(out)
}
