//! Image quality metrics driving carousel selection.

use crate::codec::PixelBuffer;

/// Sharpness, contrast and brightness, each normalized into [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityMetrics {
    pub sharpness: f64,
    pub contrast: f64,
    pub brightness: f64,
}

/// Analyze a decoded buffer: brightness is mean luminance, contrast is
/// luminance standard deviation, sharpness is the mean absolute Laplacian
/// response. All clamped to [0, 1].
pub fn analyze(buf: &PixelBuffer) -> QualityMetrics {
    let (w, h) = (buf.width as usize, buf.height as usize);
    let pixel_count = w * h;
    if pixel_count == 0 {
        return QualityMetrics { sharpness: 0.0, contrast: 0.0, brightness: 0.0 };
    }

    let luma: Vec<f64> = buf
        .pixels
        .chunks_exact(3)
        .map(|px| 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64)
        .collect();

    let mean = luma.iter().sum::<f64>() / pixel_count as f64;
    let variance = luma.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / pixel_count as f64;
    let brightness = (mean / 255.0).clamp(0.0, 1.0);
    let contrast = (variance.sqrt() / 127.5).clamp(0.0, 1.0);

    let sharpness = if w < 3 || h < 3 {
        0.0
    } else {
        let mut total = 0.0;
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let center = luma[y * w + x];
                let laplacian = 4.0 * center
                    - luma[y * w + x - 1]
                    - luma[y * w + x + 1]
                    - luma[(y - 1) * w + x]
                    - luma[(y + 1) * w + x];
                total += laplacian.abs();
            }
        }
        let mean_response = total / ((w - 2) * (h - 2)) as f64;
        (mean_response / 255.0).clamp(0.0, 1.0)
    };

    QualityMetrics { sharpness, contrast, brightness }
}
