//! Color Feature Extractor
//!
//! Lightweight, lighting-robust color statistics computed from a downsampled
//! copy of the leaf image. These drive both the symptom gate and the
//! heuristic classifier, so they never depend on the model.

use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Side length of the square sample the statistics are computed on
pub const COLOR_SAMPLE_SIZE: u32 = 128;

/// Color statistics of a leaf image.
///
/// Channel means and `std_rgb` are on the [0, 1] scale. The derived signals
/// are small signed differences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorFeatures {
    pub mean_r: f64,
    pub mean_g: f64,
    pub mean_b: f64,
    /// Mean of the three per-channel standard deviations
    pub std_rgb: f64,
    pub brightness: f64,
    /// Green mean minus the average of red and blue means
    pub green_dominance: f64,
    /// `r + g - 1.4 b`; rises with yellow/brown shift
    pub yellow_tint: f64,
    /// `((1 - g) + r) / 2`; rises with browning and desiccation
    pub dryness: f64,
}

impl ColorFeatures {
    /// Derive the scalar signals from channel means and the mean channel std.
    pub fn from_channel_stats(mean: [f64; 3], std_rgb: f64) -> Self {
        let [r, g, b] = mean;
        Self {
            mean_r: r,
            mean_g: g,
            mean_b: b,
            std_rgb,
            brightness: (r + g + b) / 3.0,
            green_dominance: g - (r + b) / 2.0,
            yellow_tint: r + g - b * 1.4,
            dryness: ((1.0 - g) + r) / 2.0,
        }
    }
}

/// Normalized RGB samples of an image at the fixed sample resolution.
///
/// Row-major, interleaved `[r, g, b, r, g, b, ...]`, each in [0, 1].
#[derive(Debug, Clone)]
pub struct ColorSample {
    pixels: Vec<f32>,
}

impl ColorSample {
    /// Resize `image` to `COLOR_SAMPLE_SIZE` square and normalize to [0, 1].
    pub fn from_image(image: &RgbImage) -> Self {
        Self::with_size(image, COLOR_SAMPLE_SIZE)
    }

    /// Same as [`ColorSample::from_image`] with an explicit side length.
    pub fn with_size(image: &RgbImage, size: u32) -> Self {
        let resized = imageops::resize(image, size, size, FilterType::Triangle);
        let pixels = resized
            .as_raw()
            .iter()
            .map(|&v| v as f32 / 255.0)
            .collect();
        Self { pixels }
    }

    /// Per-channel mean and population standard deviation.
    pub fn features(&self) -> ColorFeatures {
        let count = (self.pixels.len() / 3).max(1) as f64;

        let mut sum = [0.0f64; 3];
        for px in self.pixels.chunks_exact(3) {
            for c in 0..3 {
                sum[c] += px[c] as f64;
            }
        }
        let mean = [sum[0] / count, sum[1] / count, sum[2] / count];

        let mut sq = [0.0f64; 3];
        for px in self.pixels.chunks_exact(3) {
            for c in 0..3 {
                let d = px[c] as f64 - mean[c];
                sq[c] += d * d;
            }
        }
        let std_rgb = (0..3).map(|c| (sq[c] / count).sqrt()).sum::<f64>() / 3.0;

        ColorFeatures::from_channel_stats(mean, std_rgb)
    }

    /// MD5 of the normalized pixel buffer (little-endian f32 bytes), read as a
    /// big-endian integer.
    ///
    /// Identical images hash identically; this is the only source of
    /// variation the heuristic classifier uses between images whose features
    /// land in the same bucket.
    pub fn content_hash(&self) -> u128 {
        let mut context = md5::Context::new();
        for value in &self.pixels {
            context.consume(value.to_le_bytes());
        }
        u128::from_be_bytes(context.finalize().0)
    }
}

/// Compute [`ColorFeatures`] for an image.
pub fn extract_color_features(image: &RgbImage) -> ColorFeatures {
    ColorSample::from_image(image).features()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(r: u8, g: u8, b: u8) -> RgbImage {
        RgbImage::from_pixel(64, 64, Rgb([r, g, b]))
    }

    #[test]
    fn test_solid_color_has_no_variance() {
        let features = extract_color_features(&solid(51, 153, 102));
        assert!(features.std_rgb < 1e-6);
        assert!((features.mean_r - 0.2).abs() < 1e-3);
        assert!((features.mean_g - 0.6).abs() < 1e-3);
        assert!((features.mean_b - 0.4).abs() < 1e-3);
    }

    #[test]
    fn test_derived_signals() {
        let f = ColorFeatures::from_channel_stats([0.2, 0.6, 0.4], 0.1);
        assert!((f.brightness - 0.4).abs() < 1e-9);
        assert!((f.green_dominance - 0.3).abs() < 1e-9);
        assert!((f.yellow_tint - 0.24).abs() < 1e-9);
        assert!((f.dryness - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_striped_image_has_spread() {
        let image = RgbImage::from_fn(128, 128, |x, _| {
            if (x / 16) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let features = extract_color_features(&image);
        assert!((features.brightness - 0.5).abs() < 0.02);
        assert!(features.std_rgb > 0.45);
    }

    #[test]
    fn test_content_hash_is_deterministic_and_content_sensitive() {
        let a = ColorSample::from_image(&solid(10, 200, 30));
        let b = ColorSample::from_image(&solid(10, 200, 30));
        let c = ColorSample::from_image(&solid(10, 201, 30));
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn test_sample_size_normalizes_input_resolution() {
        let sample = ColorSample::from_image(&RgbImage::new(300, 90));
        assert_eq!(sample.pixels.len(), (COLOR_SAMPLE_SIZE * COLOR_SAMPLE_SIZE * 3) as usize);
    }
}
