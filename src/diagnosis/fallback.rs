//! Heuristic Fallback Classifier
//!
//! Maps color statistics to a small fixed vocabulary when the model path is
//! unavailable or untrustworthy. First matching rule wins:
//!
//! | # | rule | label | base |
//! |---|------|-------|------|
//! | 1 | green_dominance > 0.04, yellow_tint < 0.08, dryness < 0.55, 0.30 < brightness < 0.85 | Healthy Crop | 82 |
//! | 2 | std_rgb > 0.20 | Leaf Spot | 65 |
//! | 3 | yellow_tint > 0.18 | Nutrient Deficiency | 67 |
//! | 4 | dryness > 0.55, brightness < 0.45 | Leaf Blight | 66 |
//! | 5 | green_dominance < -0.08, mean_r > 0.4 | Rust | 66 |
//! | 6 | otherwise | Powdery Mildew | 64 |
//!
//! Confidence is `base + floor((|green_dominance| + std_rgb + rng_boost) * 20)`
//! clamped to [60, 93], where `rng_boost` comes from the pixel content hash.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::recommend::HeuristicLabel;
use crate::vision::{ColorFeatures, ColorSample};

pub const MIN_FALLBACK_CONFIDENCE: f64 = 60.0;
pub const MAX_FALLBACK_CONFIDENCE: f64 = 93.0;

/// Output of the heuristic classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicPrediction {
    pub label: HeuristicLabel,
    /// Whole-number confidence in [60, 93]
    pub confidence: f64,
    pub features: ColorFeatures,
    pub rng_boost: f64,
}

/// Tie-breaker in [0, 0.55] derived from the content hash
pub fn rng_boost(content_hash: u128) -> f64 {
    (content_hash % 23) as f64 / 40.0
}

/// Pick the label for a feature vector.
pub fn heuristic_label(features: &ColorFeatures) -> HeuristicLabel {
    let f = features;
    if f.green_dominance > 0.04
        && f.yellow_tint < 0.08
        && f.dryness < 0.55
        && f.brightness > 0.30
        && f.brightness < 0.85
    {
        HeuristicLabel::HealthyCrop
    } else if f.std_rgb > 0.20 {
        HeuristicLabel::LeafSpot
    } else if f.yellow_tint > 0.18 {
        HeuristicLabel::NutrientDeficiency
    } else if f.dryness > 0.55 && f.brightness < 0.45 {
        HeuristicLabel::LeafBlight
    } else if f.green_dominance < -0.08 && f.mean_r > 0.4 {
        HeuristicLabel::Rust
    } else {
        HeuristicLabel::PowderyMildew
    }
}

/// Classify precomputed features with an explicit tie-breaker.
pub fn classify_features(features: &ColorFeatures, rng_boost: f64) -> HeuristicPrediction {
    let label = heuristic_label(features);
    let spread = (features.green_dominance.abs() + features.std_rgb + rng_boost) * 20.0;
    let confidence = (label.base_confidence() as f64 + spread.floor())
        .clamp(MIN_FALLBACK_CONFIDENCE, MAX_FALLBACK_CONFIDENCE);

    HeuristicPrediction {
        label,
        confidence,
        features: *features,
        rng_boost,
    }
}

/// Classify an image from its 128x128 color sample.
pub fn classify_image(image: &RgbImage) -> HeuristicPrediction {
    let sample = ColorSample::from_image(image);
    classify_features(&sample.features(), rng_boost(sample.content_hash()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn features(
        mean_r: f64,
        std_rgb: f64,
        brightness: f64,
        green_dominance: f64,
        yellow_tint: f64,
        dryness: f64,
    ) -> ColorFeatures {
        ColorFeatures {
            mean_r,
            mean_g: 0.5,
            mean_b: 0.3,
            std_rgb,
            brightness,
            green_dominance,
            yellow_tint,
            dryness,
        }
    }

    #[test]
    fn test_each_branch_in_priority_order() {
        let cases = [
            (features(0.3, 0.05, 0.5, 0.10, 0.05, 0.40), HeuristicLabel::HealthyCrop),
            (features(0.3, 0.25, 0.5, -0.02, 0.05, 0.40), HeuristicLabel::LeafSpot),
            (features(0.3, 0.10, 0.5, 0.00, 0.30, 0.40), HeuristicLabel::NutrientDeficiency),
            (features(0.3, 0.10, 0.40, 0.00, 0.10, 0.60), HeuristicLabel::LeafBlight),
            (features(0.5, 0.10, 0.50, -0.10, 0.10, 0.50), HeuristicLabel::Rust),
            (features(0.3, 0.10, 0.60, 0.00, 0.10, 0.40), HeuristicLabel::PowderyMildew),
        ];

        for (features, expected) in cases {
            for boost in [0.0, 0.3, 0.55] {
                let prediction = classify_features(&features, boost);
                assert_eq!(prediction.label, expected);
                assert!((60.0..=93.0).contains(&prediction.confidence));
                assert_eq!(prediction.confidence.fract(), 0.0);
            }
        }
    }

    #[test]
    fn test_confidence_formula() {
        // 65 + floor((0.02 + 0.25 + 0) * 20) = 65 + 5
        let spot = classify_features(&features(0.3, 0.25, 0.5, -0.02, 0.05, 0.4), 0.0);
        assert_eq!(spot.confidence, 70.0);

        // 64 + floor((0 + 0.1 + 0.45) * 20) = 64 + 11
        let mildew = classify_features(&features(0.3, 0.10, 0.6, 0.0, 0.1, 0.4), 0.45);
        assert_eq!(mildew.confidence, 75.0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let vivid = classify_features(&features(0.1, 0.19, 0.5, 0.30, 0.0, 0.3), 0.55);
        assert_eq!(vivid.label, HeuristicLabel::HealthyCrop);
        assert_eq!(vivid.confidence, MAX_FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_rng_boost_range() {
        assert_eq!(rng_boost(0), 0.0);
        assert_eq!(rng_boost(22), 0.55);
        assert_eq!(rng_boost(23), 0.0);
        assert!((rng_boost(u128::MAX) - (u128::MAX % 23) as f64 / 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_image_classification_is_deterministic() {
        let image = RgbImage::from_fn(96, 96, |x, y| Rgb([(x * 2) as u8, 120 + (y % 40) as u8, 60]));
        let a = classify_image(&image);
        let b = classify_image(&image);
        assert_eq!(a, b);
    }

    #[test]
    fn test_green_leaf_is_healthy() {
        let prediction = classify_image(&RgbImage::from_pixel(224, 224, Rgb([30, 150, 130])));
        assert_eq!(prediction.label, HeuristicLabel::HealthyCrop);
        assert!(prediction.confidence >= 87.0);
    }
}
