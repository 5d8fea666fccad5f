//! Leaf diagnosis
//!
//! The decision layer around the disease classifier:
//! - `gate`: Stage-1 health gate and Stage-2 disease resolution rules
//! - `engine`: [`DiagnosisEngine`], model access and fallback routing
//! - `fallback`: heuristic classifier used when the model cannot answer
//! - `labels`: class label parsing and crop normalization
//! - `recommend`: static agronomic guidance
//! - `result`: request and result types

pub mod engine;
pub mod fallback;
pub mod gate;
pub mod labels;
pub mod recommend;
pub mod result;

pub use engine::{DiagnosisEngine, HEALTHY_CROP, HEALTHY_NOTE};
pub use fallback::{classify_features, classify_image, HeuristicPrediction};
pub use gate::{GateDecision, Verdict, CONFIDENCE_CAP, LOW_CONF_THRESHOLD};
pub use labels::{crop_from_filename, derive_crop, normalize_crop, parse_label, ParsedLabel};
pub use recommend::{recommendation_for, HeuristicLabel, Recommendation};
pub use result::{DiagnosisRequest, DiagnosisResult, HealthStatus};
