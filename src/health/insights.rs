//! Crop Health Assessment
//!
//! Runs the multi-head health model, applies the crop-conditioned adjustment
//! and turns the adjusted probabilities into issues and recommendations.
//! Every line of text is derived from the model output and the context.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::adjust::CropAdjustment;
use super::context::{ContextFeatures, CropContext};
use crate::utils::{round2, Result};

/// Multi-label disease indicators, in model output order
pub const DISEASE_TYPES: [&str; 8] = [
    "yellowing",
    "browning",
    "dark_spots",
    "pest_damage",
    "low_vigor",
    "fungal_infection",
    "bacterial_spot",
    "leaf_curl",
];

const CRITICAL_ISSUE_THRESHOLD: f64 = 0.3;
const MODERATE_ISSUE_THRESHOLD: f64 = 0.4;
const DISEASE_THRESHOLD: f64 = 0.5;
const HIGH_SEVERITY_THRESHOLD: f64 = 0.7;

/// Raw output of a health model for one image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthOutput {
    /// `[healthy, moderate, critical]`, sums to 1
    pub health: [f32; 3],
    /// Independent probabilities per [`DISEASE_TYPES`] entry
    pub diseases: [f32; 8],
}

/// A trained crop health model.
pub trait HealthModel: Send + Sync {
    fn predict(&self, image: &RgbImage, context: &ContextFeatures) -> Result<HealthOutput>;

    /// Whether the model consumes the context vector
    fn is_multi_modal(&self) -> bool;

    /// Adjustment constants matching the model variant
    fn adjustment(&self) -> CropAdjustment {
        if self.is_multi_modal() {
            CropAdjustment::MULTI_MODAL
        } else {
            CropAdjustment::SINGLE_MODAL
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropHealthStatus {
    Healthy,
    Moderate,
    Critical,
}

impl CropHealthStatus {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Healthy,
            1 => Self::Moderate,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Moderate => "moderate",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for CropHealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Moderate,
    High,
}

impl Severity {
    fn for_probability(p: f64) -> Self {
        if p > HIGH_SEVERITY_THRESHOLD {
            Self::High
        } else {
            Self::Moderate
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedDisease {
    #[serde(rename = "type")]
    pub kind: String,
    /// Probability on the 0-100 scale
    pub confidence: f64,
    pub severity: Severity,
}

/// Result of [`assess_crop_health`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAssessment {
    pub health_status: CropHealthStatus,
    /// Probability of the chosen status on the 0-100 scale
    pub confidence: f64,
    /// Health probabilities as the model produced them
    pub raw_probabilities: [f64; 3],
    /// Health probabilities after the crop adjustment
    pub probabilities: [f64; 3],
    pub issues: Vec<Issue>,
    pub recommendations: Vec<String>,
    pub detected_diseases: Vec<DetectedDisease>,
    pub model_derived: bool,
}

/// Assess crop health for one image under `context`.
pub fn assess_crop_health(
    model: &dyn HealthModel,
    image: &RgbImage,
    context: &CropContext,
) -> Result<HealthAssessment> {
    let output = model.predict(image, &context.encode())?;
    let raw = output.health.map(f64::from);
    let adjusted = model.adjustment().apply(context.declared_crop(), raw);

    tracing::debug!(
        crop = context.crop_label(),
        ?raw,
        ?adjusted,
        multi_modal = model.is_multi_modal(),
        "Crop health probabilities"
    );

    let mut assessment = generate_insights(adjusted, &output.diseases, context);
    assessment.raw_probabilities = raw;
    Ok(assessment)
}

/// Derive status, issues and recommendations from health probabilities.
pub fn generate_insights(
    health: [f64; 3],
    diseases: &[f32; 8],
    context: &CropContext,
) -> HealthAssessment {
    let crop = context.crop_label();
    let mut status_index = 0;
    for i in 1..3 {
        if health[i] > health[status_index] {
            status_index = i;
        }
    }
    let status = CropHealthStatus::from_index(status_index);
    let confidence = health[status_index] * 100.0;
    let [healthy_p, moderate_p, critical_p] = health;

    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if status == CropHealthStatus::Healthy {
        issues.push(Issue {
            kind: "healthy".to_string(),
            severity: Severity::None,
            description: format!(
                "Model assessment for {crop}: Healthy condition predicted ({confidence:.1}% confidence). {crop}-specific analysis indicates good health."
            ),
        });
        recommendations.push(format!(
            "Model assessment for {crop}: Continue current management practices. {crop} shows positive health indicators."
        ));
    } else {
        if critical_p > CRITICAL_ISSUE_THRESHOLD {
            issues.push(Issue {
                kind: "critical_condition".to_string(),
                severity: Severity::High,
                description: format!(
                    "Model assessment for {crop}: Critical health condition predicted ({:.1}% probability). {crop}-specific analysis indicates severe stress.",
                    critical_p * 100.0
                ),
            });
            recommendations.push(format!(
                "Model assessment for {crop}: Immediate intervention required. {crop} shows critical stress response under current conditions."
            ));
        }
        if moderate_p > MODERATE_ISSUE_THRESHOLD {
            issues.push(Issue {
                kind: "moderate_stress".to_string(),
                severity: Severity::Moderate,
                description: format!(
                    "Model assessment for {crop}: Moderate stress conditions detected ({:.1}% probability). {crop}-specific indicators show stress.",
                    moderate_p * 100.0
                ),
            });
            recommendations.push(format!(
                "Model assessment for {crop}: Monitor closely. {crop} shows moderate stress response that requires attention."
            ));
        }
    }

    let mut detected_diseases = Vec::new();
    for (kind, &p) in DISEASE_TYPES.iter().zip(diseases.iter()) {
        let p = f64::from(p);
        if p > DISEASE_THRESHOLD {
            let severity = Severity::for_probability(p);
            detected_diseases.push(DetectedDisease {
                kind: kind.to_string(),
                confidence: round2(p * 100.0),
                severity,
            });
            issues.push(Issue {
                kind: kind.to_string(),
                severity,
                description: format!(
                    "Model detected {} with {:.1}% confidence. This prediction is based on learned patterns from training data.",
                    kind.replace('_', " "),
                    p * 100.0
                ),
            });
        }
    }

    if context.declared_crop().is_some() {
        if healthy_p > 0.7 {
            recommendations.push(format!(
                "Model assessment for {crop}: Strong healthy signal ({:.1}% probability). {crop} appears well-adapted to current conditions.",
                healthy_p * 100.0
            ));
        } else if moderate_p > 0.5 {
            recommendations.push(format!(
                "Model assessment for {crop}: Moderate stress detected ({:.1}% probability). {crop} may require attention under these conditions.",
                moderate_p * 100.0
            ));
        } else if critical_p > 0.3 {
            recommendations.push(format!(
                "Model assessment for {crop}: Critical condition indicated ({:.1}% probability). {crop} shows significant stress response.",
                critical_p * 100.0
            ));
        }

        let stressed = status != CropHealthStatus::Healthy;

        if let Some(weather) = context.weather.as_ref().filter(|_| stressed) {
            if weather.temp < 15.0 {
                recommendations.push(format!(
                    "Model indicates {crop} shows sensitivity to low temperatures ({:.1}°C) - prediction confidence: {confidence:.1}%",
                    weather.temp
                ));
            } else if weather.temp > 35.0 {
                recommendations.push(format!(
                    "Model indicates {crop} shows sensitivity to high temperatures ({:.1}°C) - prediction confidence: {confidence:.1}%",
                    weather.temp
                ));
            }
            if weather.humidity > 80.0 {
                recommendations.push(format!(
                    "Model suggests {crop} may be affected by high humidity ({:.1}%) - current prediction: {status}",
                    weather.humidity
                ));
            }
        }

        if let Some(stage) = context.crop_stage.as_ref().filter(|_| stressed) {
            recommendations.push(format!(
                "Model assessment for {crop} at {stage} stage: {status} condition predicted ({confidence:.1}% confidence). Crop-specific response detected."
            ));
        }
    }

    if let Some(soil) = context.soil.as_ref().filter(|_| status != CropHealthStatus::Healthy) {
        if soil.ph < 6.0 || soil.ph > 7.5 {
            recommendations.push(format!(
                "Model assessment suggests soil pH ({:.1}) may be contributing to stress conditions for {crop}.",
                soil.ph
            ));
        }
        if soil.moisture < 20.0 {
            recommendations.push(format!(
                "Model indicates low soil moisture ({:.1}%) may be affecting {crop} health.",
                soil.moisture
            ));
        } else if soil.moisture > 60.0 {
            recommendations.push(format!(
                "Model suggests high soil moisture ({:.1}%) may be causing stress in {crop}.",
                soil.moisture
            ));
        }
    }

    let mut unique = Vec::with_capacity(recommendations.len());
    for line in recommendations {
        if !unique.contains(&line) {
            unique.push(line);
        }
    }

    HealthAssessment {
        health_status: status,
        confidence: round2(confidence),
        raw_probabilities: health,
        probabilities: health,
        issues,
        recommendations: unique,
        detected_diseases,
        model_derived: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::context::{Soil, Weather};
    use image::Rgb;

    struct FixedHealthModel {
        output: HealthOutput,
        multi_modal: bool,
    }

    impl HealthModel for FixedHealthModel {
        fn predict(&self, _image: &RgbImage, _context: &ContextFeatures) -> Result<HealthOutput> {
            Ok(self.output)
        }

        fn is_multi_modal(&self) -> bool {
            self.multi_modal
        }
    }

    fn leaf() -> RgbImage {
        RgbImage::from_pixel(32, 32, Rgb([60, 140, 60]))
    }

    #[test]
    fn test_healthy_assessment() {
        let context = CropContext::for_crop("Tomato");
        let assessment = generate_insights([0.8, 0.15, 0.05], &[0.0; 8], &context);

        assert_eq!(assessment.health_status, CropHealthStatus::Healthy);
        assert_eq!(assessment.confidence, 80.0);
        assert_eq!(assessment.issues.len(), 1);
        assert_eq!(assessment.issues[0].severity, Severity::None);
        assert!(assessment.recommendations[1].contains("Strong healthy signal (80.0% probability)"));
    }

    #[test]
    fn test_critical_with_context() {
        let context = CropContext {
            crop_type: Some("Wheat".into()),
            crop_stage: Some("Flowering".into()),
            weather: Some(Weather {
                temp: 38.0,
                humidity: 85.0,
                rain: 0.0,
            }),
            soil: Some(Soil {
                ph: 5.5,
                moisture: 70.0,
            }),
        };
        let assessment = generate_insights([0.1, 0.2, 0.7], &[0.0; 8], &context);

        assert_eq!(assessment.health_status, CropHealthStatus::Critical);
        let kinds: Vec<&str> = assessment.issues.iter().map(|i| i.kind.as_str()).collect();
        assert_eq!(kinds, vec!["critical_condition"]);

        let text = assessment.recommendations.join("\n");
        assert!(text.contains("Immediate intervention required"));
        assert!(text.contains("high temperatures (38.0°C)"));
        assert!(text.contains("high humidity (85.0%)"));
        assert!(text.contains("at Flowering stage: critical condition"));
        assert!(text.contains("soil pH (5.5)"));
        assert!(text.contains("high soil moisture (70.0%)"));
    }

    #[test]
    fn test_context_lines_need_a_declared_crop() {
        let context = CropContext {
            weather: Some(Weather {
                temp: 5.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        let assessment = generate_insights([0.1, 0.6, 0.3], &[0.0; 8], &context);
        assert_eq!(assessment.health_status, CropHealthStatus::Moderate);
        assert!(!assessment.recommendations.iter().any(|r| r.contains("temperatures")));
    }

    #[test]
    fn test_disease_indicators() {
        let mut diseases = [0.1f32; 8];
        diseases[0] = 0.8;
        diseases[5] = 0.6;
        let assessment = generate_insights([0.2, 0.5, 0.3], &diseases, &CropContext::default());

        let detected: Vec<(&str, Severity)> = assessment
            .detected_diseases
            .iter()
            .map(|d| (d.kind.as_str(), d.severity))
            .collect();
        assert_eq!(
            detected,
            vec![("yellowing", Severity::High), ("fungal_infection", Severity::Moderate)]
        );
        assert!(assessment
            .issues
            .iter()
            .any(|i| i.description.starts_with("Model detected fungal infection")));
    }

    #[test]
    fn test_assess_applies_single_modal_adjustment() {
        let model = FixedHealthModel {
            output: HealthOutput {
                health: [0.34, 0.33, 0.33],
                diseases: [0.0; 8],
            },
            multi_modal: false,
        };

        let paddy = assess_crop_health(&model, &leaf(), &CropContext::for_crop("Paddy")).unwrap();
        let wheat = assess_crop_health(&model, &leaf(), &CropContext::for_crop("Wheat")).unwrap();

        assert_eq!(paddy.health_status, CropHealthStatus::Healthy);
        assert_eq!(wheat.health_status, CropHealthStatus::Moderate);
        assert!((paddy.raw_probabilities[0] - 0.34).abs() < 1e-6);
        assert!((paddy.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_assess_without_crop_keeps_raw_probabilities() {
        let model = FixedHealthModel {
            output: HealthOutput {
                health: [0.25, 0.5, 0.25],
                diseases: [0.0; 8],
            },
            multi_modal: true,
        };
        let assessment = assess_crop_health(&model, &leaf(), &CropContext::default()).unwrap();
        assert_eq!(assessment.probabilities, assessment.raw_probabilities);
        assert_eq!(assessment.health_status, CropHealthStatus::Moderate);
    }

    #[test]
    fn test_serialized_shape() {
        let assessment = generate_insights([0.9, 0.05, 0.05], &[0.0; 8], &CropContext::default());
        let json = serde_json::to_value(&assessment).unwrap();
        assert_eq!(json["healthStatus"], "healthy");
        assert_eq!(json["issues"][0]["type"], "healthy");
        assert_eq!(json["modelDerived"], true);
    }
}
