//! Classifier input contract
//!
//! The model expects a fixed square grayscale frame, histogram-equalized
//! and normalized to `[0, 1]`. This mirrors the preprocessing the model
//! was trained with; changing it silently degrades every prediction.

use image::imageops::FilterType;
use image::GrayImage;

use crate::camera::Frame;

/// Side length of the model's square input.
pub const MODEL_INPUT_SIZE: u32 = 32;

/// Convert a captured frame into the model's input tensor:
/// resize to 32×32, grayscale, equalize, normalize to `[0, 1]`.
/// Row-major, `MODEL_INPUT_SIZE²` values.
pub fn preprocess(frame: &Frame) -> Vec<f32> {
    let gray = frame
        .resize_exact(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, FilterType::Triangle)
        .to_luma8();
    let equalized = equalize_histogram(&gray);
    equalized
        .pixels()
        .map(|p| f32::from(p.0[0]) / 255.0)
        .collect()
}

/// Standard histogram equalization over an 8-bit grayscale image.
fn equalize_histogram(img: &GrayImage) -> GrayImage {
    let total = (img.width() * img.height()) as u32;
    if total == 0 {
        return img.clone();
    }

    let mut histogram = [0u32; 256];
    for pixel in img.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let mut cdf = [0u32; 256];
    let mut running = 0u32;
    for (value, count) in histogram.iter().enumerate() {
        running += count;
        cdf[value] = running;
    }

    // Smallest non-zero CDF value anchors the remap.
    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    let denom = total.saturating_sub(cdf_min);

    let map = |value: u8| -> u8 {
        if denom == 0 {
            // Flat image: every pixel has the same value.
            return value;
        }
        let scaled = ((cdf[value as usize] - cdf_min) as f32 / denom as f32) * 255.0;
        scaled.round().clamp(0.0, 255.0) as u8
    };

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        image::Luma([map(img.get_pixel(x, y).0[0])])
    })
}
