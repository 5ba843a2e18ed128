//! Shared test data builders.
#![allow(dead_code)]

use image::{Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Deterministic JPEG bytes; different seeds give different payloads.
pub fn jpeg_bytes(seed: u8, width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            seed.wrapping_add((x * 5) as u8),
            seed.wrapping_mul(7).wrapping_add((y * 3) as u8),
            seed ^ ((x * y) as u8),
        ])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .expect("jpeg encode failed");
    out.into_inner()
}

/// Write a test image into `dir` and return its path.
pub fn write_test_image(dir: &Path, name: &str, seed: u8) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, jpeg_bytes(seed, 64, 48)).expect("failed to write test image");
    path
}
