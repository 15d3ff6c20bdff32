//! Synthetic page images for backends without a real acquisition path.
//!
//! A placeholder is drawn as a white page carrying the acquisition metadata
//! in a built-in bitmap font. When drawing is unavailable (the `imaging`
//! feature is off) or fails, a minimal valid file of the requested format
//! is used instead, so placeholder acquisition never fails.

use crate::core::{AcquiredImage, BackendKind, ScanParameters};
use crate::imaging::fallback::minimal_image;

use chrono::{DateTime, Utc};

/// Page width in pixels.
pub const PAGE_WIDTH: u32 = 800;
/// Page height in pixels.
pub const PAGE_HEIGHT: u32 = 1000;

/// What a placeholder page prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderInfo {
    /// Backend that produced the page.
    pub backend: BackendKind,
    /// Device the acquisition was requested from.
    pub device_id: String,
    /// Per-backend acquisition counter; also seeds the page decoration.
    pub sequence: u64,
    /// When the acquisition happened.
    pub timestamp: DateTime<Utc>,
}

impl PlaceholderInfo {
    /// Describes an acquisition happening now.
    pub fn new(backend: BackendKind, device_id: impl Into<String>) -> Self {
        Self {
            backend,
            device_id: device_id.into(),
            sequence: 0,
            timestamp: Utc::now(),
        }
    }

    /// Sets the acquisition counter.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Sets the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[cfg_attr(not(feature = "imaging"), allow(dead_code))]
    fn lines(&self, params: &ScanParameters) -> Vec<String> {
        vec![
            format!("DEVICE: {}", self.device_id),
            format!("CAPTURE: {:04}", self.sequence),
            format!("FORMAT: {}", params.format),
            format!("RESOLUTION: {} DPI", params.resolution),
            format!("MODE: {}", params.color_mode),
            format!("TIME: {}", self.timestamp.format("%Y-%m-%dT%H:%M:%SZ")),
        ]
    }
}

/// Synthesizes a placeholder image in the requested format.
pub fn placeholder(info: &PlaceholderInfo, params: &ScanParameters) -> AcquiredImage {
    let data = draw(info, params).unwrap_or_else(|| minimal_image(params.format).to_vec());
    AcquiredImage::new(data, params.format)
}

#[cfg(feature = "imaging")]
fn draw(info: &PlaceholderInfo, params: &ScanParameters) -> Option<Vec<u8>> {
    match render::page(info, params) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!(
                backend = %info.backend,
                format = %params.format,
                error = %e,
                "Placeholder drawing failed, using minimal image"
            );
            None
        }
    }
}

#[cfg(not(feature = "imaging"))]
fn draw(_info: &PlaceholderInfo, _params: &ScanParameters) -> Option<Vec<u8>> {
    None
}

#[cfg(feature = "imaging")]
mod render {
    use super::{PlaceholderInfo, PAGE_HEIGHT, PAGE_WIDTH};
    use crate::core::{ScanError, ScanParameters};
    use crate::imaging::font::{draw_text, text_width, GLYPH_HEIGHT};
    use crate::imaging::normalize::encode;

    use image::{DynamicImage, Rgb, RgbImage};

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

    const MARGIN: u32 = 50;
    const TITLE_SCALE: u32 = 3;
    const BODY_SCALE: u32 = 2;
    const LINE_PITCH: u32 = 40;
    const DECORATION_COUNT: u64 = 10;
    const DECORATION_SIZE: u32 = 50;
    // Decorations stay below the text block.
    const DECORATION_TOP: u32 = 420;
    const GOLDEN: f64 = 0.618_033_988_749_895;

    pub(super) fn page(
        info: &PlaceholderInfo,
        params: &ScanParameters,
    ) -> Result<Vec<u8>, ScanError> {
        let mut page = RgbImage::from_pixel(PAGE_WIDTH, PAGE_HEIGHT, WHITE);

        let title = format!("SCANBRIDGE {} PLACEHOLDER", info.backend);
        draw_text(&mut page, title_x(&title), MARGIN, TITLE_SCALE, &title, BLACK);

        let body_top = MARGIN + GLYPH_HEIGHT * TITLE_SCALE + LINE_PITCH;
        for (i, line) in info.lines(params).iter().enumerate() {
            draw_text(&mut page, MARGIN, body_top + i as u32 * LINE_PITCH, BODY_SCALE, line, BLACK);
        }

        for index in 0..DECORATION_COUNT {
            let (x, y) = decoration_origin(info.sequence, index);
            outline(&mut page, x, y, DECORATION_SIZE, GRAY);
        }

        encode(DynamicImage::ImageRgb8(page), params)
    }

    /// Left edge that centres the title, or the margin if it is too wide.
    fn title_x(title: &str) -> u32 {
        let width = text_width(title, TITLE_SCALE);
        if width + 2 * MARGIN > PAGE_WIDTH {
            return MARGIN;
        }
        (PAGE_WIDTH - width) / 2
    }

    /// Deterministic pseudo-random placement from the golden-ratio sequence.
    fn decoration_origin(seed: u64, index: u64) -> (u32, u32) {
        let n = seed
            .wrapping_mul(DECORATION_COUNT)
            .wrapping_add(index + 1) as f64;
        let fx = (n * GOLDEN) % 1.0;
        let fy = (n * GOLDEN * GOLDEN) % 1.0;

        let x = fx * f64::from(PAGE_WIDTH - DECORATION_SIZE);
        let y = fy * f64::from(PAGE_HEIGHT - DECORATION_TOP - DECORATION_SIZE);
        (x as u32, DECORATION_TOP + y as u32)
    }

    fn outline(page: &mut RgbImage, x: u32, y: u32, size: u32, color: Rgb<u8>) {
        let (width, height) = page.dimensions();
        let right = (x + size - 1).min(width - 1);
        let bottom = (y + size - 1).min(height - 1);

        for px in x..=right {
            page.put_pixel(px, y, color);
            page.put_pixel(px, bottom, color);
        }
        for py in y..=bottom {
            page.put_pixel(x, py, color);
            page.put_pixel(right, py, color);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_title_is_centred() {
            let title = "SCANBRIDGE SANE PLACEHOLDER";
            let left = title_x(title);
            let right = PAGE_WIDTH - left - text_width(title, TITLE_SCALE);
            assert!(left.abs_diff(right) <= 1);
            assert!(left > MARGIN);

            let long = "X".repeat(60);
            assert_eq!(title_x(&long), MARGIN);
        }

        #[test]
        fn test_body_starts_below_title() {
            let body_top = MARGIN + GLYPH_HEIGHT * TITLE_SCALE + LINE_PITCH;
            assert!(body_top > MARGIN + GLYPH_HEIGHT * TITLE_SCALE);
            // six metadata lines still end above the decorations
            assert!(body_top + 6 * LINE_PITCH <= DECORATION_TOP);
        }

        #[test]
        fn test_decorations_stay_on_page() {
            for seed in [0, 1, 7, u64::MAX] {
                for index in 0..DECORATION_COUNT {
                    let (x, y) = decoration_origin(seed, index);
                    assert!(x + DECORATION_SIZE <= PAGE_WIDTH);
                    assert!(y >= DECORATION_TOP);
                    assert!(y + DECORATION_SIZE <= PAGE_HEIGHT);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OutputFormat;
    use chrono::TimeZone;

    fn info() -> PlaceholderInfo {
        PlaceholderInfo::new(BackendKind::Mock, "scanner_mock")
            .with_sequence(3)
            .with_timestamp(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap())
    }

    #[test]
    fn test_placeholder_matches_requested_format() {
        for format in [
            OutputFormat::Jpeg,
            OutputFormat::Png,
            OutputFormat::Tiff,
            OutputFormat::Bmp,
        ] {
            let params = ScanParameters::default().with_format(format);
            let image = placeholder(&info(), &params);

            assert_eq!(image.format, format);
            assert!(!image.is_empty());
            assert_eq!(OutputFormat::sniff(&image.data), Some(format));
        }
    }

    #[test]
    fn test_lines_carry_metadata() {
        let params = ScanParameters::default().with_resolution(600);
        let lines = info().lines(&params);

        assert!(lines.contains(&"DEVICE: scanner_mock".to_string()));
        assert!(lines.contains(&"CAPTURE: 0003".to_string()));
        assert!(lines.contains(&"RESOLUTION: 600 DPI".to_string()));
        assert!(lines.contains(&"TIME: 2024-03-09T14:05:07Z".to_string()));
    }

    #[cfg(feature = "imaging")]
    #[test]
    fn test_drawn_page_has_text() {
        use image::GenericImageView;

        let params = ScanParameters::default().with_format(OutputFormat::Png);
        let image = placeholder(&info(), &params);
        let decoded = image::load_from_memory(&image.data).unwrap();

        assert_eq!(decoded.dimensions(), (PAGE_WIDTH, PAGE_HEIGHT));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 255, 255, 255]);
        let rgb = decoded.to_rgb8();
        assert!(rgb.pixels().any(|p| p.0 == [0, 0, 0]));
    }

    #[cfg(feature = "imaging")]
    #[test]
    fn test_drawing_is_deterministic() {
        let params = ScanParameters::default().with_format(OutputFormat::Png);
        assert_eq!(placeholder(&info(), &params), placeholder(&info(), &params));
    }

    #[cfg(not(feature = "imaging"))]
    #[test]
    fn test_without_imaging_uses_minimal_image() {
        let params = ScanParameters::default().with_format(OutputFormat::Tiff);
        let image = placeholder(&info(), &params);
        assert_eq!(image.data, minimal_image(OutputFormat::Tiff));
    }
}
