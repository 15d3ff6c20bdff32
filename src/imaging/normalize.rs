//! Conversion of acquired images into the requested output format.
//!
//! Formats without an alpha channel (JPEG, BMP) are flattened onto a white
//! background before encoding, so a transparent pixel lands as white paper
//! rather than black.

use crate::core::{AcquiredImage, OutputFormat, ScanError, ScanParameters};

#[cfg(feature = "imaging")]
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat, Rgb, RgbImage, Rgba};
#[cfg(feature = "imaging")]
use std::io::Cursor;

/// Converts an acquired image to the requested format.
///
/// Images already in the requested format pass through untouched.
pub fn normalize(
    acquired: AcquiredImage,
    params: &ScanParameters,
) -> Result<AcquiredImage, ScanError> {
    if acquired.format == params.format {
        return Ok(acquired);
    }

    tracing::debug!(
        from = %acquired.format,
        to = %params.format,
        size = acquired.len(),
        "Converting acquired image"
    );
    convert(&acquired.data, Source::Encoded(acquired.format), params)
}

/// Converts a portable anymap (the raw output of `scanimage`) to the
/// requested format.
pub fn from_pnm(data: &[u8], params: &ScanParameters) -> Result<AcquiredImage, ScanError> {
    convert(data, Source::Pnm, params)
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Encoded(OutputFormat),
    Pnm,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoded(format) => write!(f, "{}", format),
            Self::Pnm => write!(f, "pnm"),
        }
    }
}

#[cfg(feature = "imaging")]
fn convert(
    data: &[u8],
    source: Source,
    params: &ScanParameters,
) -> Result<AcquiredImage, ScanError> {
    let hint = match source {
        Source::Encoded(format) => image_format(format),
        Source::Pnm => ImageFormat::Pnm,
    };

    let decoded = image::load_from_memory_with_format(data, hint)
        .map_err(|e| ScanError::encoding(format!("failed to decode {}: {}", source, e)))?;

    let encoded = encode(decoded, params)?;
    Ok(AcquiredImage::new(encoded, params.format))
}

#[cfg(not(feature = "imaging"))]
fn convert(
    _data: &[u8],
    source: Source,
    params: &ScanParameters,
) -> Result<AcquiredImage, ScanError> {
    Err(ScanError::encoding(format!(
        "converting {} to {} requires the `imaging` feature",
        source, params.format
    )))
}

#[cfg(feature = "imaging")]
fn image_format(format: OutputFormat) -> ImageFormat {
    match format {
        OutputFormat::Jpeg => ImageFormat::Jpeg,
        OutputFormat::Png => ImageFormat::Png,
        OutputFormat::Tiff => ImageFormat::Tiff,
        OutputFormat::Bmp => ImageFormat::Bmp,
    }
}

/// Encodes a decoded image in the requested format.
#[cfg(feature = "imaging")]
pub(crate) fn encode(image: DynamicImage, params: &ScanParameters) -> Result<Vec<u8>, ScanError> {
    let mut out = Vec::new();

    match params.format {
        OutputFormat::Jpeg => {
            let quality = params.compression_quality.clamp(1, 100);
            let encoder = JpegEncoder::new_with_quality(&mut out, quality);
            flatten_onto_white(&image)
                .write_with_encoder(encoder)
                .map_err(|e| ScanError::encoding(format!("failed to encode jpeg: {}", e)))?;
        }
        OutputFormat::Bmp => {
            DynamicImage::ImageRgb8(flatten_onto_white(&image))
                .write_to(&mut Cursor::new(&mut out), ImageFormat::Bmp)
                .map_err(|e| ScanError::encoding(format!("failed to encode bmp: {}", e)))?;
        }
        format @ (OutputFormat::Png | OutputFormat::Tiff) => {
            image
                .write_to(&mut Cursor::new(&mut out), image_format(format))
                .map_err(|e| {
                    ScanError::encoding(format!("failed to encode {}: {}", format, e))
                })?;
        }
    }

    Ok(out)
}

/// Composites an image onto white, dropping the alpha channel.
#[cfg(feature = "imaging")]
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
