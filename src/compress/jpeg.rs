use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use super::{CompressOptions, Compressor};
use crate::error::CompressError;

/// Re-encodes any decodable image as a baseline JPEG
///
/// Images larger than the output bounds are scaled down to fit,
/// keeping their aspect ratio. Smaller images are never upscaled.
#[derive(Debug, Clone, Copy)]
pub struct JpegCompressor {
    filter: FilterType,
}

impl JpegCompressor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for JpegCompressor {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl Compressor for JpegCompressor {
    fn compress(&self, input: &[u8], options: &CompressOptions) -> Result<Vec<u8>, CompressError> {
        if input.is_empty() {
            return Err(CompressError::EmptyInput);
        }

        // Format is sniffed from the bytes, not the file name
        let img = image::load_from_memory(input)?;
        let (width, height) = img.dimensions();

        // Fit inside the bounds; resize() keeps the aspect ratio
        let img = if width > options.max_width || height > options.max_height {
            let resized = img.resize(options.max_width, options.max_height, self.filter);
            debug!(
                "downscaled {}x{} -> {}x{}",
                width,
                height,
                resized.width(),
                resized.height()
            );
            resized
        } else {
            img
        };

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

        // Encode straight into memory at the requested quality
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, options.quality.percent());
        rgb.write_with_encoder(encoder)?;

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::Quality;
    use image::{ImageFormat, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    /// Deterministic noisy gradient, encoded as PNG
    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let noise = (x.wrapping_mul(7919) ^ y.wrapping_mul(104_729)) % 64;
            image::Rgb([
                ((x * 255 / width.max(1)) as u8).wrapping_add(noise as u8),
                ((y * 255 / height.max(1)) as u8).wrapping_sub(noise as u8),
                (noise * 3) as u8,
            ])
        });
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn compress(input: &[u8], quality: f32) -> Result<Vec<u8>, CompressError> {
        JpegCompressor::new().compress(input, &CompressOptions::new(Quality::new(quality)))
    }

    #[test]
    fn test_output_is_jpeg_within_bounds() {
        let out = compress(&sample_png(1600, 1200), 0.8).unwrap();

        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (800, 600));
    }

    #[test]
    fn test_portrait_is_bounded_by_height() {
        let out = compress(&sample_png(300, 1000), 0.8).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (240, 800));
    }

    #[test]
    fn test_small_images_are_not_upscaled() {
        let out = compress(&sample_png(120, 80), 0.5).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (120, 80));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let input = sample_png(400, 400);
        let low = compress(&input, 0.1).unwrap();
        let high = compress(&input, 1.0).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_transparent_input_is_flattened() {
        let img = RgbaImage::from_pixel(64, 64, Rgba([200, 10, 10, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();

        let out = compress(buf.get_ref(), 0.8).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert_eq!(compress(&[], 0.8), Err(CompressError::EmptyInput));
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        let result = compress(b"definitely not an image", 0.8);
        assert!(matches!(result, Err(CompressError::Decode(_))));
    }
}
