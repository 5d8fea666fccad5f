//! Classifier Contract
//!
//! The decision layer only sees a trained model through [`Classifier`]:
//! an RGB image in, one probability per class index out. Ranking and the
//! ImageNet preprocessing shared by the `burn` networks live here too.

use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::class_map::ClassMap;
use crate::utils::Result;

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A trained image classifier.
pub trait Classifier: Send + Sync {
    /// Class probabilities for `image`, indexed like the class map.
    fn predict(&self, image: &RgbImage) -> Result<Vec<f32>>;

    /// Short backend description for logs
    fn name(&self) -> &str {
        "classifier"
    }
}

/// Resize to a square input and normalize with ImageNet statistics.
///
/// Returns CHW layout: `[C, H, W]` flattened.
pub fn preprocess(image: &RgbImage, size: u32) -> Vec<f32> {
    let resized = imageops::resize(image, size, size, FilterType::Triangle);
    let num_pixels = (size * size) as usize;

    let mut normalized = vec![0.0f32; 3 * num_pixels];
    for (i, pixel) in resized.pixels().enumerate() {
        for c in 0..3 {
            normalized[c * num_pixels + i] =
                (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    normalized
}

/// One class of a ranked prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    pub index: usize,
    pub probability: f32,
}

/// Class indices ordered by descending probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPrediction {
    ranked: Vec<RankedClass>,
}

impl RankedPrediction {
    /// Rank a probability vector. Ties keep the lower index first; NaN sorts last.
    pub fn from_probabilities(probabilities: &[f32]) -> Self {
        let mut ranked: Vec<RankedClass> = probabilities
            .iter()
            .enumerate()
            .map(|(index, &probability)| RankedClass { index, probability })
            .collect();
        ranked.sort_by(|a, b| {
            let a = if a.probability.is_nan() { f32::NEG_INFINITY } else { a.probability };
            let b = if b.probability.is_nan() { f32::NEG_INFINITY } else { b.probability };
            b.total_cmp(&a)
        });
        Self { ranked }
    }

    pub fn top1(&self) -> Option<&RankedClass> {
        self.ranked.first()
    }

    /// Top-1 probability, 0 for an empty prediction
    pub fn top1_probability(&self) -> f32 {
        self.top1().map(|c| c.probability).unwrap_or(0.0)
    }

    pub fn top_k(&self, k: usize) -> &[RankedClass] {
        &self.ranked[..k.min(self.ranked.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// First class among the top `k` whose label mentions "healthy"
    pub fn find_healthy<'a>(&'a self, class_map: &ClassMap, k: usize) -> Option<&'a RankedClass> {
        self.top_k(k).iter().find(|class| {
            class_map
                .label_or_placeholder(class.index)
                .to_lowercase()
                .contains("healthy")
        })
    }

    /// Human-readable top-k listing
    pub fn display(&self, class_map: &ClassMap, k: usize) -> String {
        let mut output = String::new();
        for (i, class) in self.top_k(k).iter().enumerate() {
            output.push_str(&format!(
                "  {}. {} (class {}) - {:.2}%\n",
                i + 1,
                class_map.label_or_placeholder(class.index),
                class.index,
                class.probability * 100.0
            ));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_ranking_is_descending() {
        let ranked = RankedPrediction::from_probabilities(&[0.1, 0.6, 0.05, 0.25]);
        let order: Vec<usize> = ranked.top_k(4).iter().map(|c| c.index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
        assert_eq!(ranked.top1_probability(), 0.6);
    }

    #[test]
    fn test_ties_keep_lower_index_first() {
        let ranked = RankedPrediction::from_probabilities(&[0.25, 0.5, 0.25]);
        let order: Vec<usize> = ranked.top_k(3).iter().map(|c| c.index).collect();
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn test_top_k_is_bounded() {
        let ranked = RankedPrediction::from_probabilities(&[0.3, 0.7]);
        assert_eq!(ranked.top_k(5).len(), 2);
        assert!(RankedPrediction::from_probabilities(&[]).top1().is_none());
    }

    #[test]
    fn test_find_healthy_only_scans_top_k() {
        let map = ClassMap::from_labels([
            "Tomato___Early_blight",
            "Tomato___Late_blight",
            "Tomato___Leaf_Mold",
            "Tomato___healthy",
        ]);
        let ranked = RankedPrediction::from_probabilities(&[0.4, 0.3, 0.2, 0.1]);
        assert!(ranked.find_healthy(&map, 3).is_none());
        assert_eq!(ranked.find_healthy(&map, 4).map(|c| c.index), Some(3));
    }

    #[test]
    fn test_preprocess_layout() {
        let image = RgbImage::from_pixel(50, 30, Rgb([255, 0, 0]));
        let tensor = preprocess(&image, 16);
        assert_eq!(tensor.len(), 3 * 16 * 16);

        let red = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let green = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        assert!((tensor[0] - red).abs() < 1e-5);
        assert!((tensor[16 * 16] - green).abs() < 1e-5);
    }
}
