//! Two-Stage Health Gate
//!
//! Stage 1 fuses the model's ranking with the color heuristics into a
//! Healthy/Unhealthy verdict. Stage 2 runs only for Unhealthy verdicts and
//! turns the top-1 label into a disease diagnosis.
//!
//! ```text
//! healthy_score   = 0.6 * (health_score + max(0, green_dominance * 90)) + 0.4 * healthy_conf
//! unhealthy_score = top1 * 100 + symptom_count * 8
//! unhealthy      <=> unhealthy_score >= healthy_score && (any symptom || top1 >= 0.70)
//! ```
//!
//! Everything here is pure; the engine owns model access and fallback routing.

use serde::{Deserialize, Serialize};

use super::labels::{parse_label, ParsedLabel};
use super::recommend::{recommendation_for, Recommendation};
use crate::inference::{ClassMap, RankedPrediction, HEALTHY_SCAN_DEPTH};
use crate::utils::{DeepLeafError, Result};
use crate::vision::{yellow_penalty, ColorFeatures, SymptomFlags};

/// Stage-2 confidence below which the model result is discarded
pub const LOW_CONF_THRESHOLD: f64 = 30.0;
/// Ceiling for disease confidence backed by fewer than two symptoms
pub const CONFIDENCE_CAP: f64 = 80.0;
/// Top-1 probability that alone corroborates an Unhealthy verdict
pub const HIGH_MODEL_CONFIDENCE: f32 = 0.70;
/// Points added to the unhealthy score per symptom flag
pub const SYMPTOM_WEIGHT: f64 = 8.0;

pub const MIN_HEALTHY_CONFIDENCE: f64 = 60.0;
pub const MAX_HEALTHY_CONFIDENCE: f64 = 97.0;

const HEURISTIC_WEIGHT: f64 = 0.6;
const MODEL_WEIGHT: f64 = 0.4;
const GREEN_BONUS_SCALE: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Healthy,
    Unhealthy,
}

/// Stage-1 outcome with the scores that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub verdict: Verdict,
    pub healthy_score: f64,
    pub unhealthy_score: f64,
    /// Probability (0-100) of the first healthy class in the top ranks, 0 if none
    pub healthy_conf_model: f64,
    /// Raw label of that healthy class
    pub healthy_label: Option<String>,
    pub top1_label: Option<String>,
    pub top1_probability: f32,
    pub symptom_count: usize,
}

impl GateDecision {
    pub fn is_healthy(&self) -> bool {
        self.verdict == Verdict::Healthy
    }

    /// Confidence of a Healthy verdict: the combined score minus the
    /// yellowing penalty, clamped to [60, 97].
    pub fn healthy_confidence(&self, features: &ColorFeatures) -> f64 {
        healthy_confidence(self.healthy_score, features.yellow_tint)
    }

    /// Label a Healthy verdict takes its crop from
    pub fn crop_source_label(&self) -> Option<&str> {
        self.healthy_label
            .as_deref()
            .or(self.top1_label.as_deref())
    }
}

/// Combined healthy score from the heuristic and model signals
pub fn healthy_score(symptoms: &SymptomFlags, features: &ColorFeatures, healthy_conf_model: f64) -> f64 {
    let green_bonus = (features.green_dominance * GREEN_BONUS_SCALE).max(0.0);
    HEURISTIC_WEIGHT * (symptoms.health_score + green_bonus) + MODEL_WEIGHT * healthy_conf_model
}

pub fn unhealthy_score(top1_probability: f32, symptom_count: usize) -> f64 {
    top1_probability as f64 * 100.0 + symptom_count as f64 * SYMPTOM_WEIGHT
}

/// Apply the Stage-1 decision rule to precomputed scores.
pub fn decide(
    healthy_score: f64,
    unhealthy_score: f64,
    symptoms: &SymptomFlags,
    top1_probability: f32,
) -> Verdict {
    let corroborated = symptoms.any() || top1_probability >= HIGH_MODEL_CONFIDENCE;
    if unhealthy_score >= healthy_score && corroborated {
        Verdict::Unhealthy
    } else {
        Verdict::Healthy
    }
}

/// Run Stage 1 over a ranked model prediction.
pub fn evaluate(
    features: &ColorFeatures,
    symptoms: &SymptomFlags,
    ranked: &RankedPrediction,
    class_map: &ClassMap,
) -> GateDecision {
    let healthy = ranked.find_healthy(class_map, HEALTHY_SCAN_DEPTH);
    let healthy_conf_model = healthy.map(|c| c.probability as f64 * 100.0).unwrap_or(0.0);
    let top1_probability = ranked.top1_probability();
    let symptom_count = symptoms.count();

    let healthy_score = healthy_score(symptoms, features, healthy_conf_model);
    let unhealthy_score = unhealthy_score(top1_probability, symptom_count);
    let verdict = decide(healthy_score, unhealthy_score, symptoms, top1_probability);

    GateDecision {
        verdict,
        healthy_score,
        unhealthy_score,
        healthy_conf_model,
        healthy_label: healthy.map(|c| class_map.label_or_placeholder(c.index)),
        top1_label: ranked.top1().map(|c| class_map.label_or_placeholder(c.index)),
        top1_probability,
        symptom_count,
    }
}

pub fn healthy_confidence(healthy_score: f64, yellow_tint: f64) -> f64 {
    (healthy_score - yellow_penalty(yellow_tint)).clamp(MIN_HEALTHY_CONFIDENCE, MAX_HEALTHY_CONFIDENCE)
}

/// Cap disease confidence that too few symptoms back up.
pub fn cap_confidence(confidence: f64, is_healthy: bool, symptom_count: usize) -> f64 {
    if !is_healthy && confidence > CONFIDENCE_CAP && symptom_count < 2 {
        CONFIDENCE_CAP
    } else {
        confidence
    }
}

/// Stage-2 outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseResolution {
    pub parsed: ParsedLabel,
    /// Capped confidence on the 0-100 scale
    pub confidence: f64,
    pub recommendation: Recommendation,
}

/// Run Stage 2 on the top-1 label.
///
/// Fails with [`DeepLeafError::LowConfidence`] below [`LOW_CONF_THRESHOLD`],
/// carrying the parsed crop so the fallback result keeps it.
pub fn resolve_disease(label: &str, top1_probability: f32, symptom_count: usize) -> Result<DiseaseResolution> {
    let parsed = parse_label(label);
    let confidence = top1_probability as f64 * 100.0;

    if confidence < LOW_CONF_THRESHOLD {
        return Err(DeepLeafError::LowConfidence {
            confidence,
            crop_type: parsed.crop_type,
        });
    }

    let confidence = cap_confidence(confidence, parsed.is_healthy, symptom_count);
    let recommendation = recommendation_for(&parsed.disease_key, parsed.is_healthy);

    Ok(DiseaseResolution {
        parsed,
        confidence,
        recommendation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_features() -> ColorFeatures {
        ColorFeatures {
            mean_r: 0.3,
            mean_g: 0.5,
            mean_b: 0.3,
            std_rgb: 0.05,
            brightness: 0.5,
            green_dominance: 0.05,
            yellow_tint: 0.05,
            dryness: 0.4,
        }
    }

    fn map() -> ClassMap {
        ClassMap::from_labels([
            "Tomato___Early_blight",
            "Tomato___healthy",
            "Corn_(maize)___Common_rust_",
            "Tomato___Leaf_Mold",
        ])
    }

    #[test]
    fn test_clean_leaf_with_moderate_model_is_healthy() {
        let features = clean_features();
        let symptoms = SymptomFlags::detect(&features);
        assert!(!symptoms.any());

        let ranked = RankedPrediction::from_probabilities(&[0.5, 0.1, 0.3, 0.1]);
        let decision = evaluate(&features, &symptoms, &ranked, &map());

        assert_eq!(decision.verdict, Verdict::Healthy);
        // 0.6 * (92 + 4.5) + 0.4 * 10
        assert!((decision.healthy_score - 61.9).abs() < 1e-4);
        assert!((decision.unhealthy_score - 50.0).abs() < 1e-4);
        assert_eq!(decision.healthy_label.as_deref(), Some("Tomato___healthy"));
    }

    #[test]
    fn test_confident_model_alone_is_unhealthy() {
        let features = clean_features();
        let symptoms = SymptomFlags::detect(&features);
        let ranked = RankedPrediction::from_probabilities(&[0.05, 0.0, 0.95, 0.0]);

        let decision = evaluate(&features, &symptoms, &ranked, &map());
        assert_eq!(decision.verdict, Verdict::Unhealthy);
        assert_eq!(decision.top1_label.as_deref(), Some("Corn_(maize)___Common_rust_"));
        assert_eq!(decision.healthy_conf_model, 0.0);
    }

    #[test]
    fn test_score_alone_does_not_override_clean_leaf() {
        let symptoms = SymptomFlags::detect(&clean_features());
        // Unhealthy score wins but nothing corroborates it.
        assert_eq!(decide(50.0, 65.0, &symptoms, 0.65), Verdict::Healthy);
        assert_eq!(decide(50.0, 70.0, &symptoms, 0.70), Verdict::Unhealthy);
    }

    #[test]
    fn test_healthy_scan_is_limited_to_top_three() {
        let features = clean_features();
        let symptoms = SymptomFlags::detect(&features);
        let ranked = RankedPrediction::from_probabilities(&[0.4, 0.05, 0.3, 0.25]);

        let decision = evaluate(&features, &symptoms, &ranked, &map());
        assert!(decision.healthy_label.is_none());
        assert_eq!(decision.crop_source_label(), Some("Tomato___Early_blight"));
    }

    #[test]
    fn test_healthy_confidence_is_clamped() {
        assert_eq!(healthy_confidence(120.0, 0.0), MAX_HEALTHY_CONFIDENCE);
        assert_eq!(healthy_confidence(40.0, 0.0), MIN_HEALTHY_CONFIDENCE);
        // 80 - (0.2 - 0.1) * 80
        assert!((healthy_confidence(80.0, 0.2) - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_cap() {
        assert_eq!(cap_confidence(95.0, false, 0), 80.0);
        assert_eq!(cap_confidence(95.0, false, 1), 80.0);
        assert_eq!(cap_confidence(95.0, false, 2), 95.0);
        assert_eq!(cap_confidence(95.0, true, 0), 95.0);
        assert_eq!(cap_confidence(75.0, false, 0), 75.0);
    }

    #[test]
    fn test_resolve_disease_caps_and_recommends() {
        let resolution = resolve_disease("Corn_(maize)___Common_rust_", 0.95, 0).unwrap();
        assert_eq!(resolution.confidence, 80.0);
        assert_eq!(resolution.parsed.display_name, "Common Rust");
        assert_eq!(resolution.parsed.crop_type.as_deref(), Some("maize"));
        assert!(resolution.recommendation.solution.contains("triazole"));
    }

    #[test]
    fn test_low_confidence_keeps_crop() {
        match resolve_disease("Corn_(maize)___Common_rust_", 0.25, 3) {
            Err(DeepLeafError::LowConfidence { confidence, crop_type }) => {
                assert_eq!(confidence, 25.0);
                assert_eq!(crop_type.as_deref(), Some("maize"));
            }
            other => panic!("expected low confidence, got {other:?}"),
        }
    }
}
