//! Crop health assessment
//!
//! The second model path: a multi-head health model whose
//! `[healthy, moderate, critical]` output is conditioned on the declared crop.
//!
//! - `context`: crop/stage/weather/soil and their vector encoding
//! - `adjust`: crop-conditioned probability adjustment
//! - `insights`: the assessment and its model-derived text
//! - `specificity`: checks that different crops yield different outcomes

pub mod adjust;
pub mod context;
pub mod insights;
pub mod specificity;

pub use adjust::CropAdjustment;
pub use context::{
    crop_index, ContextFeatures, CropContext, Soil, Weather, CONTEXT_FEATURES, CROP_STAGES,
    CROP_TYPES,
};
pub use insights::{
    assess_crop_health, generate_insights, CropHealthStatus, DetectedDisease, HealthAssessment,
    HealthModel, HealthOutput, Issue, Severity, DISEASE_TYPES,
};
pub use specificity::{validate_crop_specificity, SpecificityReport};
