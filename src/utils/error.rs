//! Error Handling Module
//!
//! Defines the error taxonomy for leaf diagnosis.
//! Uses thiserror for ergonomic error definitions.
//!
//! Only [`DeepLeafError::Decode`] is meant to reach the caller of a diagnosis;
//! the inference-path kinds are recovered by the heuristic fallback.

use thiserror::Error;

/// Main error type for DeepLeaf operations
#[derive(Error, Debug)]
pub enum DeepLeafError {
    /// The input bytes could not be decoded as a raster image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Weights, class map, or classifier backend are missing
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// The model ran but its top-1 confidence is below the usable threshold
    #[error("Low model confidence ({confidence:.1})")]
    LowConfidence {
        /// Top-1 confidence on the 0-100 scale
        confidence: f64,
        /// Crop parsed from the discarded label, kept for the fallback result
        crop_type: Option<String>,
    },

    /// Any other failure while running the classifier
    #[error("Inference error: {0}")]
    Inference(String),

    /// Class map could not be read or is malformed
    #[error("Class map error: {0}")]
    ClassMap(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DeepLeafError {
    /// Short, user-safe reason string for provenance fields.
    pub fn short_reason(&self) -> String {
        match self {
            DeepLeafError::Decode(_) => "decode_error".to_string(),
            DeepLeafError::ModelUnavailable(_) | DeepLeafError::ClassMap(_) => {
                "model_unavailable".to_string()
            }
            DeepLeafError::LowConfidence { confidence, .. } => {
                format!("low_conf({:.1})", confidence)
            }
            other => {
                let message = other.to_string();
                let first_line = message.lines().next().unwrap_or_default();
                let truncated: String = first_line.chars().take(80).collect();
                format!("ml_failure: {}", truncated)
            }
        }
    }
}

impl From<serde_json::Error> for DeepLeafError {
    fn from(err: serde_json::Error) -> Self {
        DeepLeafError::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for DeepLeafError {
    fn from(err: image::ImageError) -> Self {
        DeepLeafError::Decode(err.to_string())
    }
}

/// Convenience Result type for DeepLeaf operations
pub type Result<T> = std::result::Result<T, DeepLeafError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| DeepLeafError::InvalidInput(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| DeepLeafError::InvalidInput(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| DeepLeafError::InvalidInput(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| DeepLeafError::InvalidInput(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeepLeafError::ModelUnavailable("weights missing".to_string());
        assert_eq!(format!("{}", err), "Model unavailable: weights missing");
    }

    #[test]
    fn test_short_reason() {
        let low = DeepLeafError::LowConfidence {
            confidence: 25.04,
            crop_type: Some("maize".into()),
        };
        assert_eq!(low.short_reason(), "low_conf(25.0)");

        let missing = DeepLeafError::ModelUnavailable("/models/x.mpk not found".into());
        assert_eq!(missing.short_reason(), "model_unavailable");

        let failure = DeepLeafError::Inference("shape mismatch\nat layer fc2".into());
        assert_eq!(failure.short_reason(), "ml_failure: Inference error: shape mismatch");
    }

    #[test]
    fn test_option_context() {
        let opt: Option<i32> = None;
        let with_context = opt.context("Value was None");
        assert!(matches!(with_context, Err(DeepLeafError::InvalidInput(_))));
    }
}
