//! Diagnosis Engine
//!
//! Entry point of the decision layer. [`DiagnosisEngine::diagnose`] always
//! returns a shaped [`DiagnosisResult`]: every failure on the model path is
//! matched by kind and routed to the heuristic classifier. Only an
//! undecodable image, in [`DiagnosisEngine::diagnose_bytes`], reaches the
//! caller as an error.

use image::RgbImage;
use tracing::{debug, warn};

use super::fallback::{classify_features, rng_boost};
use super::gate::{self, GateDecision};
use super::labels::{crop_from_filename, derive_crop, normalize_crop};
use super::recommend::GATE_HEALTHY;
use super::result::{
    DiagnosisRequest, DiagnosisResult, HealthStatus, HEURISTIC_ALERT_THRESHOLD, MODEL_ALERT_THRESHOLD,
};
use crate::config::DeepLeafConfig;
use crate::health::{
    assess_crop_health, specificity, validate_crop_specificity, CropContext, HealthAssessment,
    SpecificityReport,
};
use crate::inference::InferenceContext;
use crate::utils::{DeepLeafError, Result};
use crate::vision::{decode_image, ColorFeatures, ColorSample, SymptomFlags, COLOR_SAMPLE_SIZE};

/// Prediction text of healthy model results
pub const HEALTHY_CROP: &str = "Healthy Crop";
/// Note attached to healthy model results
pub const HEALTHY_NOTE: &str = "No visible disease or nutrient deficiency detected";

/// Runs diagnoses against one [`InferenceContext`]
pub struct DiagnosisEngine {
    context: InferenceContext,
}

impl DiagnosisEngine {
    pub fn new(context: InferenceContext) -> Self {
        Self { context }
    }

    /// Engine that loads its models lazily from `config`.
    pub fn from_config(config: DeepLeafConfig) -> Self {
        Self::new(InferenceContext::new(config))
    }

    pub fn context(&self) -> &InferenceContext {
        &self.context
    }

    /// Decode `bytes` and diagnose the image.
    pub fn diagnose_bytes(&self, bytes: &[u8], request: &DiagnosisRequest) -> Result<DiagnosisResult> {
        let image = decode_image(bytes)?;
        Ok(self.diagnose(&image, request))
    }

    /// Diagnose a decoded leaf image.
    pub fn diagnose(&self, image: &RgbImage, request: &DiagnosisRequest) -> DiagnosisResult {
        let sample = ColorSample::with_size(image, self.context.config().color_sample_size);
        let features = sample.features();
        let symptoms = SymptomFlags::detect(&features);
        debug!(
            ?features,
            symptoms = ?symptoms.names(),
            health_score = symptoms.health_score,
            "Color analysis"
        );

        let mut result = match self.diagnose_with_model(image, &features, &symptoms) {
            Ok(result) => result,
            Err(err) => self.fallback(image, &sample, err),
        };

        result.crop_type = resolve_crop(request, result.crop_type.take());
        result
    }

    /// Crop health assessment with the multi-head health model.
    pub fn assess(&self, image: &RgbImage, context: &CropContext) -> Result<HealthAssessment> {
        let model = self.context.health_model()?;
        assess_crop_health(model, image, context)
    }

    /// Compare health assessments across `crops` on one image.
    pub fn validate_specificity(&self, image: Option<&RgbImage>, crops: &[&str]) -> Result<SpecificityReport> {
        let model = self.context.health_model()?;
        let synthetic;
        let image = match image {
            Some(image) => image,
            None => {
                synthetic = specificity::synthetic_leaf();
                &synthetic
            }
        };
        if crops.is_empty() {
            validate_crop_specificity(model, image, &specificity::default_crops())
        } else {
            validate_crop_specificity(model, image, crops)
        }
    }

    fn diagnose_with_model(
        &self,
        image: &RgbImage,
        features: &ColorFeatures,
        symptoms: &SymptomFlags,
    ) -> Result<DiagnosisResult> {
        let classification = self.context.classify(image)?;
        let decision = gate::evaluate(features, symptoms, &classification.ranked, classification.class_map);
        log_decision(&decision);

        if decision.is_healthy() {
            return Ok(DiagnosisResult::from_model(
                HealthStatus::Healthy,
                HEALTHY_CROP,
                HEALTHY_CROP,
                decision.healthy_confidence(features),
                decision.crop_source_label().and_then(derive_crop),
                classification.model_version,
                &GATE_HEALTHY,
                HEALTHY_NOTE,
            ));
        }

        let label = decision
            .top1_label
            .as_deref()
            .ok_or_else(|| DeepLeafError::Inference("classifier returned no classes".to_string()))?;
        let resolution = gate::resolve_disease(label, decision.top1_probability, decision.symptom_count)?;
        let parsed = resolution.parsed;

        // The gate already ruled Unhealthy; a healthy top-1 only changes the wording.
        let (prediction, note) = if parsed.is_healthy {
            (HEALTHY_CROP.to_string(), HEALTHY_NOTE)
        } else {
            (parsed.display_name.clone(), "")
        };

        Ok(DiagnosisResult::from_model(
            HealthStatus::Unhealthy,
            parsed.display_name,
            prediction,
            resolution.confidence,
            parsed.crop_type,
            classification.model_version,
            &resolution.recommendation,
            note,
        ))
    }

    /// Heuristic result for a failed model path.
    ///
    /// The heuristics always read a `COLOR_SAMPLE_SIZE` sample; the Stage-1
    /// sample is reused only when it was taken at that size.
    fn fallback(&self, image: &RgbImage, stage1: &ColorSample, error: DeepLeafError) -> DiagnosisResult {
        let reason = error.short_reason();
        let (crop_type, unexpected, alert_threshold) = match &error {
            DeepLeafError::ModelUnavailable(_) | DeepLeafError::ClassMap(_) => {
                (None, false, HEURISTIC_ALERT_THRESHOLD)
            }
            DeepLeafError::LowConfidence { crop_type, .. } => {
                (crop_type.clone(), false, MODEL_ALERT_THRESHOLD)
            }
            DeepLeafError::Inference(_)
            | DeepLeafError::Decode(_)
            | DeepLeafError::Config(_)
            | DeepLeafError::Io(_)
            | DeepLeafError::Serialization(_)
            | DeepLeafError::InvalidInput(_) => (None, true, HEURISTIC_ALERT_THRESHOLD),
        };
        warn!(reason = %reason, error = %error, "Using heuristic fallback");

        let resampled;
        let sample = if self.context.config().color_sample_size == COLOR_SAMPLE_SIZE {
            stage1
        } else {
            resampled = ColorSample::from_image(image);
            &resampled
        };

        let prediction = classify_features(&sample.features(), rng_boost(sample.content_hash()));
        let label = prediction.label;
        let mut result = DiagnosisResult::from_heuristic(
            label.as_str(),
            label.is_healthy(),
            prediction.confidence,
            crop_type,
            &reason,
            &label.recommendation(),
            alert_threshold,
        );
        if unexpected {
            result.suggestions.push_str(&format!(" (fallback due to: {})", reason));
        }
        result
    }
}

fn log_decision(decision: &GateDecision) {
    debug!(
        verdict = ?decision.verdict,
        healthy_score = decision.healthy_score,
        unhealthy_score = decision.unhealthy_score,
        healthy_conf_model = decision.healthy_conf_model,
        top1 = decision.top1_label.as_deref(),
        top1_probability = decision.top1_probability,
        "Health gate"
    );
}

/// Declared crop, else the crop derived from the model label, else a crop
/// named in the file name.
fn resolve_crop(request: &DiagnosisRequest, derived: Option<String>) -> Option<String> {
    request
        .context
        .declared_crop()
        .and_then(normalize_crop)
        .or(derived)
        .or_else(|| request.file_name.as_deref().and_then(crop_from_filename))
}
