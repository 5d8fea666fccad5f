//! # DeepLeaf
//!
//! Crop-leaf health diagnosis built around a trained image classifier.
//!
//! ## Features
//!
//! - **Two-stage health gate** fusing model probabilities with color heuristics
//! - **Disease resolution** with confidence capping and symptom-count gating
//! - **Heuristic fallback** producing a result of the same shape when the model
//!   is missing, fails, or is not confident
//! - **Crop health assessment** with crop-conditioned probability adjustment
//! - **Burn framework** inference on CPU (`ndarray`) or GPU (`cuda`)
//!
//! ## Modules
//!
//! - `vision`: color features and symptom flags
//! - `inference`: classifier contract, class maps, the owned inference context
//! - `diagnosis`: health gate, fallback classifier and the diagnosis engine
//! - `health`: multi-head health model, crop context and insights
//! - `model`: CNN definitions built with Burn
//! - `utils`: logging, errors and helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deepleaf::{DeepLeafConfig, DiagnosisEngine, DiagnosisRequest};
//!
//! let engine = DiagnosisEngine::from_config(DeepLeafConfig::from_env());
//! let bytes = std::fs::read("leaf.jpg")?;
//! let result = engine.diagnose_bytes(&bytes, &DiagnosisRequest::new().with_crop_type("Tomato"))?;
//! println!("{}", result);
//! ```

pub mod backend;
pub mod config;
pub mod diagnosis;
pub mod health;
pub mod inference;
pub mod model;
pub mod utils;
pub mod vision;

// Re-export commonly used items for convenience
pub use config::DeepLeafConfig;
pub use diagnosis::{DiagnosisEngine, DiagnosisRequest, DiagnosisResult, HealthStatus};
pub use health::{CropContext, HealthAssessment, Soil, SpecificityReport, Weather};
pub use inference::{ClassMap, Classifier, InferenceContext};
pub use utils::error::{DeepLeafError, Result};
pub use vision::{decode_image, ColorFeatures, SymptomFlags};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
