//! Image codec adapter: probe → decode → DAB display profile → resize →
//! size-targeted encode.
//!
//! The pixel backend is pluggable so the transcode pipeline stays testable
//! and the backend choice stays in one place.

mod backend;

pub use backend::RasterBackend;

use crate::error::PadError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Formats the carousel accepts on ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Heif,
}

impl ImageFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Heif => "image/heif",
        }
    }

    /// Whether the encoder takes a meaningful quality parameter.
    fn is_lossy(self) -> bool {
        matches!(self, ImageFormat::Jpeg | ImageFormat::Heif)
    }
}

/// Decoded 8-bit sRGB pixels, row-major RGB triples.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 3) as usize);
        Self { width, height, pixels }
    }
}

/// Pixel-level decode/encode/resample operations supplied by the backend.
pub trait ImageBackend: Send + Sync {
    fn decode(&self, bytes: &[u8], format: ImageFormat) -> Result<PixelBuffer, PadError>;

    fn encode(
        &self,
        buf: &PixelBuffer,
        format: ImageFormat,
        quality: u8,
    ) -> Result<Vec<u8>, PadError>;

    /// Area-interpolated resample to exactly `width` × `height`.
    fn resize(&self, buf: &PixelBuffer, width: u32, height: u32) -> PixelBuffer;
}

/// Re-encoded payload ready for MOT framing.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum output width in pixels.
    pub max_width: u32,
    /// Maximum output height in pixels.
    pub max_height: u32,
    /// MOT object byte cap (simple profile).
    pub byte_cap: usize,
    /// Target encoding for re-encoded payloads.
    pub target_format: ImageFormat,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_width: 320,
            max_height: 240,
            byte_cap: 50 * 1024,
            target_format: ImageFormat::Jpeg,
        }
    }
}

/// Quality ladder for size targeting: highest quality that fits wins.
const QUALITY_LADDER: [u8; 6] = [95, 85, 75, 65, 55, 50];

/// Probe the format from magic bytes. Extension is advisory only.
pub fn probe_format(bytes: &[u8]) -> Result<ImageFormat, PadError> {
    match infer::get(bytes).map(|kind| kind.mime_type()) {
        Some("image/jpeg") => Ok(ImageFormat::Jpeg),
        Some("image/png") => Ok(ImageFormat::Png),
        Some("image/webp") => Ok(ImageFormat::Webp),
        Some("image/heif") | Some("image/heic") => Ok(ImageFormat::Heif),
        _ => Err(PadError::InvalidInput("unsupported image format".into())),
    }
}

/// Stateless transcode pipeline shared by ingest paths.
pub struct CodecAdapter {
    backend: Arc<dyn ImageBackend>,
    config: CodecConfig,
}

impl CodecAdapter {
    pub fn new(backend: Arc<dyn ImageBackend>, config: CodecConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Decode without re-encoding, for quality analysis on the raw pixels.
    pub fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, PadError> {
        let format = probe_format(bytes)?;
        self.backend.decode(bytes, format)
    }

    /// Full pipeline: probe, decode, apply the DAB display profile, resize
    /// to the configured bound and encode at the best quality that fits the
    /// byte cap.
    pub fn process(&self, bytes: &[u8]) -> Result<EncodedImage, PadError> {
        let format = probe_format(bytes)?;
        let decoded = self.backend.decode(bytes, format)?;
        self.process_decoded(&decoded)
    }

    /// Pipeline tail for callers that already hold the decoded pixels
    /// (ingest analyzes quality on the decoded buffer first).
    pub fn process_decoded(&self, decoded: &PixelBuffer) -> Result<EncodedImage, PadError> {
        let profiled = apply_display_profile(decoded);
        let bounded = self.bound_dimensions(&profiled);
        self.encode_for_cap(&bounded)
    }

    fn bound_dimensions(&self, buf: &PixelBuffer) -> PixelBuffer {
        let (max_w, max_h) = (self.config.max_width, self.config.max_height);
        if buf.width <= max_w && buf.height <= max_h {
            return buf.clone();
        }
        let scale = f64::min(
            max_w as f64 / buf.width as f64,
            max_h as f64 / buf.height as f64,
        );
        let new_w = ((buf.width as f64 * scale) as u32).max(1);
        let new_h = ((buf.height as f64 * scale) as u32).max(1);
        self.backend.resize(buf, new_w, new_h)
    }

    fn encode_for_cap(&self, buf: &PixelBuffer) -> Result<EncodedImage, PadError> {
        let format = self.config.target_format;
        let mut last_size = 0;

        if format.is_lossy() {
            for quality in QUALITY_LADDER {
                let bytes = self.backend.encode(buf, format, quality)?;
                last_size = bytes.len();
                if bytes.len() <= self.config.byte_cap {
                    return Ok(EncodedImage {
                        bytes,
                        width: buf.width,
                        height: buf.height,
                        format,
                    });
                }
            }
        } else {
            let bytes = self.backend.encode(buf, format, QUALITY_LADDER[0])?;
            last_size = bytes.len();
            if bytes.len() <= self.config.byte_cap {
                return Ok(EncodedImage {
                    bytes,
                    width: buf.width,
                    height: buf.height,
                    format,
                });
            }
        }

        Err(PadError::SizeExceeded {
            size: last_size,
            cap: self.config.byte_cap,
        })
    }
}

/// DAB display profile: 8-bit sRGB, per-channel histogram stretch, light
/// sharpening. Receivers have small low-contrast panels.
fn apply_display_profile(buf: &PixelBuffer) -> PixelBuffer {
    sharpen(&normalize_histogram(buf))
}

fn normalize_histogram(buf: &PixelBuffer) -> PixelBuffer {
    let mut min = [u8::MAX; 3];
    let mut max = [u8::MIN; 3];
    for px in buf.pixels.chunks_exact(3) {
        for ch in 0..3 {
            min[ch] = min[ch].min(px[ch]);
            max[ch] = max[ch].max(px[ch]);
        }
    }

    let mut pixels = Vec::with_capacity(buf.pixels.len());
    for px in buf.pixels.chunks_exact(3) {
        for ch in 0..3 {
            let range = max[ch].saturating_sub(min[ch]);
            let value = if range == 0 {
                px[ch]
            } else {
                (((px[ch] - min[ch]) as u32 * 255) / range as u32) as u8
            };
            pixels.push(value);
        }
    }
    PixelBuffer::new(buf.width, buf.height, pixels)
}

/// Mild unsharp pass: identity plus half the 4-neighbour Laplacian.
fn sharpen(buf: &PixelBuffer) -> PixelBuffer {
    let (w, h) = (buf.width as usize, buf.height as usize);
    if w < 3 || h < 3 {
        return buf.clone();
    }

    let src = &buf.pixels;
    let mut pixels = src.clone();
    let idx = |x: usize, y: usize, ch: usize| (y * w + x) * 3 + ch;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            for ch in 0..3 {
                let center = src[idx(x, y, ch)] as i32;
                let laplacian = 4 * center
                    - src[idx(x - 1, y, ch)] as i32
                    - src[idx(x + 1, y, ch)] as i32
                    - src[idx(x, y - 1, ch)] as i32
                    - src[idx(x, y + 1, ch)] as i32;
                pixels[idx(x, y, ch)] = (center + laplacian / 2).clamp(0, 255) as u8;
            }
        }
    }
    PixelBuffer::new(buf.width, buf.height, pixels)
}
