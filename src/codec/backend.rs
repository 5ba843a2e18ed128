//! Default pixel backend built on the `image` crate.
//!
//! JPEG, PNG and WebP decode; JPEG encodes with a quality parameter, PNG
//! and WebP (lossless) ignore it. HEIF/HEIC is recognised at probe time but
//! this backend cannot transcode it.

use super::{ImageBackend, ImageFormat, PixelBuffer};
use crate::error::PadError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{imageops::FilterType, ExtendedColorType, ImageEncoder, RgbImage};
use std::io::Cursor;

#[derive(Debug, Default)]
pub struct RasterBackend;

fn to_image_format(format: ImageFormat) -> Result<image::ImageFormat, PadError> {
    match format {
        ImageFormat::Jpeg => Ok(image::ImageFormat::Jpeg),
        ImageFormat::Png => Ok(image::ImageFormat::Png),
        ImageFormat::Webp => Ok(image::ImageFormat::WebP),
        ImageFormat::Heif => Err(PadError::InvalidInput(
            "HEIF is not supported by the raster backend".into(),
        )),
    }
}

fn to_rgb_image(buf: &PixelBuffer) -> Result<RgbImage, PadError> {
    RgbImage::from_raw(buf.width, buf.height, buf.pixels.clone())
        .ok_or_else(|| PadError::Internal("pixel buffer dimensions mismatch".into()))
}

impl ImageBackend for RasterBackend {
    fn decode(&self, bytes: &[u8], format: ImageFormat) -> Result<PixelBuffer, PadError> {
        let format = to_image_format(format)?;
        let dynamic = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| PadError::InvalidInput(format!("image decode failed: {e}")))?;
        let rgb = dynamic.to_rgb8();
        Ok(PixelBuffer::new(rgb.width(), rgb.height(), rgb.into_raw()))
    }

    fn encode(
        &self,
        buf: &PixelBuffer,
        format: ImageFormat,
        quality: u8,
    ) -> Result<Vec<u8>, PadError> {
        let rgb = to_rgb_image(buf)?;
        let mut out = Cursor::new(Vec::new());
        let result = match format {
            ImageFormat::Jpeg => JpegEncoder::new_with_quality(&mut out, quality).encode(
                rgb.as_raw(),
                buf.width,
                buf.height,
                ExtendedColorType::Rgb8,
            ),
            ImageFormat::Png => PngEncoder::new(&mut out).write_image(
                rgb.as_raw(),
                buf.width,
                buf.height,
                ExtendedColorType::Rgb8,
            ),
            ImageFormat::Webp => WebPEncoder::new_lossless(&mut out).encode(
                rgb.as_raw(),
                buf.width,
                buf.height,
                ExtendedColorType::Rgb8,
            ),
            ImageFormat::Heif => {
                return Err(PadError::InvalidInput(
                    "HEIF is not supported by the raster backend".into(),
                ))
            }
        };
        result.map_err(|e| PadError::Internal(format!("image encode failed: {e}")))?;
        Ok(out.into_inner())
    }

    fn resize(&self, buf: &PixelBuffer, width: u32, height: u32) -> PixelBuffer {
        let Ok(rgb) = to_rgb_image(buf) else {
            return buf.clone();
        };
        let resized = image::DynamicImage::ImageRgb8(rgb)
            .resize_exact(width, height, FilterType::CatmullRom)
            .to_rgb8();
        PixelBuffer::new(resized.width(), resized.height(), resized.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(width: u32, height: u32) -> PixelBuffer {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let value = if (x + y) % 2 == 0 { 230 } else { 30 };
                pixels.extend_from_slice(&[value, value, value]);
            }
        }
        PixelBuffer::new(width, height, pixels)
    }

    #[test]
    fn jpeg_round_trips_through_backend() {
        let backend = RasterBackend;
        let src = checkerboard(16, 12);
        let bytes = backend.encode(&src, ImageFormat::Jpeg, 85).unwrap();
        let decoded = backend.decode(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.width, 16);
        assert_eq!(decoded.height, 12);
    }

    #[test]
    fn lower_quality_does_not_grow_jpeg() {
        let backend = RasterBackend;
        let src = checkerboard(64, 64);
        let high = backend.encode(&src, ImageFormat::Jpeg, 95).unwrap();
        let low = backend.encode(&src, ImageFormat::Jpeg, 50).unwrap();
        assert!(low.len() <= high.len());
    }

    #[test]
    fn png_round_trips_losslessly() {
        let backend = RasterBackend;
        let src = checkerboard(8, 8);
        let bytes = backend.encode(&src, ImageFormat::Png, 95).unwrap();
        let decoded = backend.decode(&bytes, ImageFormat::Png).unwrap();
        assert_eq!(decoded.pixels, src.pixels);
    }

    #[test]
    fn heif_is_rejected() {
        let backend = RasterBackend;
        let src = checkerboard(4, 4);
        assert!(backend.encode(&src, ImageFormat::Heif, 80).is_err());
        assert!(backend.decode(&[0u8; 16], ImageFormat::Heif).is_err());
    }

    #[test]
    fn resize_hits_requested_dimensions() {
        let backend = RasterBackend;
        let src = checkerboard(64, 48);
        let out = backend.resize(&src, 32, 24);
        assert_eq!((out.width, out.height), (32, 24));
        assert_eq!(out.pixels.len(), 32 * 24 * 3);
    }
}
