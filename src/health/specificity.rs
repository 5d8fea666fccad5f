//! Crop-specificity validation
//!
//! Runs the health assessment for several crops under identical conditions
//! and checks that the outcomes actually differ between crops.

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use super::context::{CropContext, Soil, Weather, CROP_TYPES};
use super::insights::{assess_crop_health, HealthModel};
use crate::utils::Result;

/// Minimum per-class variance that counts as crop-specific
pub const VARIANCE_THRESHOLD: f64 = 0.01;

/// Adjusted health probabilities for one crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropPrediction {
    pub crop: String,
    pub healthy: f64,
    pub moderate: f64,
    pub critical: f64,
    pub predicted_class: usize,
}

/// Population variance of each health class across crops
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassVariance {
    pub healthy: f64,
    pub moderate: f64,
    pub critical: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificityReport {
    pub crop_predictions: Vec<CropPrediction>,
    pub variance: ClassVariance,
    pub unique_classes: usize,
    pub is_crop_specific: bool,
    pub test_conditions: CropContext,
}

/// Fixed stage, weather and soil the crops are compared under
pub fn test_conditions() -> CropContext {
    CropContext {
        crop_type: None,
        crop_stage: Some("Vegetative".to_string()),
        weather: Some(Weather {
            temp: 25.0,
            humidity: 60.0,
            rain: 10.0,
        }),
        soil: Some(Soil {
            ph: 6.5,
            moisture: 30.0,
        }),
    }
}

/// Evenly green 224x224 stand-in when no image is supplied
pub fn synthetic_leaf() -> RgbImage {
    RgbImage::from_pixel(224, 224, Rgb([100, 150, 100]))
}

/// The crops compared by default: the first six of the vocabulary
pub fn default_crops() -> Vec<&'static str> {
    CROP_TYPES[..6].to_vec()
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Compare health assessments of `crops` on one image.
pub fn validate_crop_specificity(
    model: &dyn HealthModel,
    image: &RgbImage,
    crops: &[&str],
) -> Result<SpecificityReport> {
    let conditions = test_conditions();
    let mut crop_predictions = Vec::with_capacity(crops.len());

    for &crop in crops {
        let context = CropContext {
            crop_type: Some(crop.to_string()),
            ..conditions.clone()
        };
        let assessment = assess_crop_health(model, image, &context)?;
        let [healthy, moderate, critical] = assessment.probabilities;
        crop_predictions.push(CropPrediction {
            crop: crop.to_string(),
            healthy,
            moderate,
            critical,
            predicted_class: assessment.health_status as usize,
        });
    }

    let healthy: Vec<f64> = crop_predictions.iter().map(|p| p.healthy).collect();
    let moderate: Vec<f64> = crop_predictions.iter().map(|p| p.moderate).collect();
    let critical: Vec<f64> = crop_predictions.iter().map(|p| p.critical).collect();
    let variance = ClassVariance {
        healthy: variance(&healthy),
        moderate: variance(&moderate),
        critical: variance(&critical),
    };

    let mut classes: Vec<usize> = crop_predictions.iter().map(|p| p.predicted_class).collect();
    classes.sort_unstable();
    classes.dedup();
    let unique_classes = classes.len();

    let is_crop_specific = variance.healthy > VARIANCE_THRESHOLD
        || variance.moderate > VARIANCE_THRESHOLD
        || variance.critical > VARIANCE_THRESHOLD
        || unique_classes > 1;

    tracing::info!(
        crops = crops.len(),
        unique_classes,
        is_crop_specific,
        "Crop-specificity validation finished"
    );

    Ok(SpecificityReport {
        crop_predictions,
        variance,
        unique_classes,
        is_crop_specific,
        test_conditions: conditions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::context::ContextFeatures;
    use crate::health::insights::HealthOutput;

    struct FlatModel;

    impl HealthModel for FlatModel {
        fn predict(&self, _image: &RgbImage, _context: &ContextFeatures) -> Result<HealthOutput> {
            Ok(HealthOutput {
                health: [0.34, 0.33, 0.33],
                diseases: [0.0; 8],
            })
        }

        fn is_multi_modal(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_variance() {
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(variance(&[0.5, 0.5]), 0.0);
        assert!((variance(&[0.0, 1.0]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_default_crops_diverge() {
        let report = validate_crop_specificity(&FlatModel, &synthetic_leaf(), &default_crops()).unwrap();

        assert_eq!(report.crop_predictions.len(), 6);
        assert_eq!(report.unique_classes, 3);
        assert!(report.is_crop_specific);

        let classes: Vec<usize> = report.crop_predictions.iter().map(|p| p.predicted_class).collect();
        assert_eq!(classes, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_identical_crops_are_not_specific() {
        let report = validate_crop_specificity(&FlatModel, &synthetic_leaf(), &["Paddy", "Paddy"]).unwrap();
        assert_eq!(report.unique_classes, 1);
        assert_eq!(report.variance.healthy, 0.0);
        assert!(!report.is_crop_specific);
    }
}
