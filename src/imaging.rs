//! Base64 image transport helpers.

use base64::{Engine, prelude::BASE64_STANDARD};
use image::{ColorType, ImageFormat};
use std::io::Cursor;
use thiserror::Error;

// anything shorter cannot carry a real image header
const MIN_IMAGE_BYTES: usize = 8;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("not valid base64 - {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image too small to be valid ({0} bytes)")]
    TooSmall(usize),
    #[error("unrecognized image format")]
    UnknownFormat,
    #[error("failed to decode image - {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image - {0}")]
    Encode(#[source] image::ImageError),
}

/// Decodes a base64 payload, accepting an optional `data:<mime>;base64,` prefix.
pub fn decode_base64_image(input: &str) -> Result<Vec<u8>, ImageError> {
    let payload = match input.split_once(',') {
        Some((_, rest)) => rest,
        None => input,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64_STANDARD.decode(cleaned.as_bytes())?;

    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ImageError::TooSmall(bytes.len()));
    }
    tracing::debug!("decoded base64 image, size: {} bytes", bytes.len());
    Ok(bytes)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    image::guess_format(bytes).map_err(|_| ImageError::UnknownFormat)
}

/// Re-encodes any supported image as an 8-bit RGB PNG.
///
/// Vision models expect plain RGB; alpha, palette and greyscale inputs are
/// converted. RGB8 PNGs are passed through untouched.
pub fn normalize_to_rgb_png(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
    let format = sniff_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format).map_err(ImageError::Decode)?;
    tracing::debug!(
        "input image format: {:?}, color: {:?}, size: {}x{}",
        format,
        img.color(),
        img.width(),
        img.height()
    );

    if format == ImageFormat::Png && img.color() == ColorType::Rgb8 {
        return Ok(bytes.to_vec());
    }

    let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(ImageError::Encode)?;
    Ok(out)
}
