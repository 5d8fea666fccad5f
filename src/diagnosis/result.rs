//! Diagnosis request and result types
//!
//! [`DiagnosisResult`] is the only value that leaves the pipeline. Model
//! backed and heuristic results share its shape; `model_version` tells them
//! apart.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::recommend::Recommendation;
use crate::health::{CropContext, Soil, Weather};
use crate::utils::round2;

/// Prefix of every heuristic provenance string
pub const FALLBACK_PROVENANCE: &str = "heuristic_fallback";

/// Alert threshold for model-backed results
pub const MODEL_ALERT_THRESHOLD: f64 = 90.0;
/// Alert threshold for heuristic results standing in for a missing or
/// failed model. Low-confidence fallbacks keep the model threshold.
pub const HEURISTIC_ALERT_THRESHOLD: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn from_healthy(is_healthy: bool) -> Self {
        if is_healthy {
            Self::Healthy
        } else {
            Self::Unhealthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of one diagnosis besides the image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisRequest {
    #[serde(flatten)]
    pub context: CropContext,
    /// Name of the uploaded file, used as a last resort for the crop
    pub file_name: Option<String>,
}

impl DiagnosisRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crop_type(mut self, crop_type: impl Into<String>) -> Self {
        self.context.crop_type = Some(crop_type.into());
        self
    }

    pub fn with_crop_stage(mut self, stage: impl Into<String>) -> Self {
        self.context.crop_stage = Some(stage.into());
        self
    }

    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.context.weather = Some(weather);
        self
    }

    pub fn with_soil(mut self, soil: Soil) -> Self {
        self.context.soil = Some(soil);
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Final diagnosis of a leaf image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    pub health_status: HealthStatus,
    pub disease: String,
    pub prediction: String,
    /// 0-100, two decimals
    pub confidence: f64,
    pub crop_type: Option<String>,
    /// Real model version or `heuristic_fallback (<reason>)`
    pub model_version: String,
    pub cause: String,
    pub suggestions: String,
    pub prevention: String,
    pub note: String,
    pub alert: bool,
}

impl DiagnosisResult {
    /// Result backed by the trained classifier.
    #[allow(clippy::too_many_arguments)]
    pub fn from_model(
        health_status: HealthStatus,
        disease: impl Into<String>,
        prediction: impl Into<String>,
        confidence: f64,
        crop_type: Option<String>,
        model_version: impl Into<String>,
        recommendation: &Recommendation,
        note: impl Into<String>,
    ) -> Self {
        let confidence = round2(confidence);
        Self {
            health_status,
            disease: disease.into(),
            prediction: prediction.into(),
            confidence,
            crop_type,
            model_version: model_version.into(),
            cause: recommendation.cause.to_string(),
            suggestions: recommendation.solution.to_string(),
            prevention: recommendation.prevention.to_string(),
            note: note.into(),
            alert: confidence >= MODEL_ALERT_THRESHOLD,
        }
    }

    /// Result of the heuristic classifier; `reason` lands in the provenance.
    pub fn from_heuristic(
        label: &str,
        is_healthy: bool,
        confidence: f64,
        crop_type: Option<String>,
        reason: &str,
        recommendation: &Recommendation,
        alert_threshold: f64,
    ) -> Self {
        let confidence = round2(confidence);
        Self {
            health_status: HealthStatus::from_healthy(is_healthy),
            disease: label.to_string(),
            prediction: label.to_string(),
            confidence,
            crop_type,
            model_version: format!("{} ({})", FALLBACK_PROVENANCE, reason),
            cause: recommendation.cause.to_string(),
            suggestions: recommendation.solution.to_string(),
            prevention: recommendation.prevention.to_string(),
            note: String::new(),
            alert: confidence >= alert_threshold,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.health_status == HealthStatus::Healthy
    }

    /// Whether the heuristic classifier produced this result
    pub fn is_fallback(&self) -> bool {
        self.model_version.starts_with(FALLBACK_PROVENANCE)
    }
}

impl fmt::Display for DiagnosisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - {:.2}% [{}]",
            self.prediction,
            self.crop_type.as_deref().unwrap_or("unknown crop"),
            self.confidence,
            self.model_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::recommend::{recommendation_for, HeuristicLabel};

    #[test]
    fn test_serializes_camel_case() {
        let result = DiagnosisResult::from_model(
            HealthStatus::Unhealthy,
            "Common Rust",
            "Common Rust",
            80.0,
            Some("maize".to_string()),
            "DeepLeaf v2.0",
            &recommendation_for("Common Rust", false),
            "",
        );
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["healthStatus"], "unhealthy");
        assert_eq!(json["cropType"], "maize");
        assert_eq!(json["modelVersion"], "DeepLeaf v2.0");
        assert_eq!(json["confidence"], 80.0);
        assert_eq!(json["alert"], false);
        assert!(json.get("suggestions").is_some());
    }

    #[test]
    fn test_confidence_is_rounded_and_alert_threshold() {
        let result = DiagnosisResult::from_model(
            HealthStatus::Healthy,
            "Healthy Crop",
            "Healthy Crop",
            91.23456,
            None,
            "v",
            &recommendation_for("", true),
            "",
        );
        assert_eq!(result.confidence, 91.23);
        assert!(result.alert);
        assert!(!result.is_fallback());
    }

    #[test]
    fn test_heuristic_provenance() {
        let label = HeuristicLabel::LeafSpot;
        let result = DiagnosisResult::from_heuristic(
            label.as_str(),
            label.is_healthy(),
            85.0,
            None,
            "model_unavailable",
            &label.recommendation(),
            HEURISTIC_ALERT_THRESHOLD,
        );
        assert_eq!(result.model_version, "heuristic_fallback (model_unavailable)");
        assert!(result.is_fallback());
        assert!(result.alert);
        assert_eq!(result.health_status, HealthStatus::Unhealthy);

        let low_conf = DiagnosisResult::from_heuristic(
            label.as_str(),
            label.is_healthy(),
            85.0,
            None,
            "low_conf(25.0)",
            &label.recommendation(),
            MODEL_ALERT_THRESHOLD,
        );
        assert!(!low_conf.alert);
    }

    #[test]
    fn test_request_flattens_context() {
        let request: DiagnosisRequest = serde_json::from_str(
            r#"{"cropType": "Tomato", "weather": {"temp": 30.0}, "fileName": "leaf.jpg"}"#,
        )
        .unwrap();
        assert_eq!(request.context.crop_type.as_deref(), Some("Tomato"));
        assert_eq!(request.context.weather.map(|w| w.temp), Some(30.0));
        assert_eq!(request.file_name.as_deref(), Some("leaf.jpg"));
    }
}
