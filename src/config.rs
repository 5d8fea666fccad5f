//! Configuration Module
//!
//! Where the trained artifacts live and the fixed resolutions the pipeline
//! works at. Every path can be overridden from the environment; a missing
//! model file is not a configuration error, the engine falls back instead.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::{DeepLeafError, Result, ResultExt};
use crate::vision::COLOR_SAMPLE_SIZE;

pub const ENV_MODELS_DIR: &str = "DEEPLEAF_MODELS_DIR";
pub const ENV_MODEL_PATH: &str = "DEEPLEAF_MODEL_PATH";
pub const ENV_CLASSES_PATH: &str = "DEEPLEAF_CLASSES_PATH";
pub const ENV_HEALTH_MODEL_PATH: &str = "DEEPLEAF_HEALTH_MODEL_PATH";
pub const ENV_MODEL_VERSION: &str = "DEEPLEAF_MODEL_VERSION";

pub const DEFAULT_MODELS_DIR: &str = "./models";
pub const DEFAULT_MODEL_FILE: &str = "deepleaf_model.mpk";
pub const DEFAULT_CLASSES_FILE: &str = "deepleaf_classes.json";
pub const DEFAULT_HEALTH_MODEL_FILE: &str = "crop_health_model.mpk";
pub const DEFAULT_MODEL_VERSION: &str = "DeepLeaf v2.0";

/// Runtime configuration for the diagnosis engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepLeafConfig {
    /// Directory the default artifact paths are resolved against
    pub models_dir: PathBuf,

    /// Disease classifier weights (burn CompactRecorder file)
    pub model_path: PathBuf,

    /// Class index to label JSON map
    pub classes_path: PathBuf,

    /// Multi-head crop health model weights
    pub health_model_path: PathBuf,

    /// Provenance string reported on model-backed results
    pub model_version: String,

    /// Square input size of the classifier
    pub model_input_size: u32,

    /// Square sample size for color statistics
    pub color_sample_size: u32,
}

impl Default for DeepLeafConfig {
    fn default() -> Self {
        Self::with_models_dir(DEFAULT_MODELS_DIR)
    }
}

impl DeepLeafConfig {
    /// Default file names resolved under `models_dir`
    pub fn with_models_dir(models_dir: impl Into<PathBuf>) -> Self {
        let models_dir = models_dir.into();
        Self {
            model_path: models_dir.join(DEFAULT_MODEL_FILE),
            classes_path: models_dir.join(DEFAULT_CLASSES_FILE),
            health_model_path: models_dir.join(DEFAULT_HEALTH_MODEL_FILE),
            models_dir,
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            model_input_size: 224,
            color_sample_size: COLOR_SAMPLE_SIZE,
        }
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overrides from an arbitrary key lookup; empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = match get(ENV_MODELS_DIR) {
            Some(dir) => Self::with_models_dir(dir),
            None => Self::default(),
        };
        if let Some(path) = get(ENV_MODEL_PATH) {
            config.model_path = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_CLASSES_PATH) {
            config.classes_path = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_HEALTH_MODEL_PATH) {
            config.health_model_path = PathBuf::from(path);
        }
        if let Some(version) = get(ENV_MODEL_VERSION) {
            config.model_version = version;
        }
        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model_input_size == 0 {
            return Err(DeepLeafError::Config(
                "model_input_size must be greater than 0".to_string(),
            ));
        }
        if self.color_sample_size == 0 {
            return Err(DeepLeafError::Config(
                "color_sample_size must be greater than 0".to_string(),
            ));
        }
        if self.model_version.trim().is_empty() {
            return Err(DeepLeafError::Config("model_version must not be empty".to_string()));
        }
        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = DeepLeafConfig::default();
        assert_eq!(config.model_path, Path::new("./models/deepleaf_model.mpk"));
        assert_eq!(config.classes_path, Path::new("./models/deepleaf_classes.json"));
        assert_eq!(config.model_version, "DeepLeaf v2.0");
        assert_eq!(config.model_input_size, 224);
        assert_eq!(config.color_sample_size, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_MODELS_DIR, "/opt/leaf"),
            (ENV_CLASSES_PATH, "/etc/classes.json"),
            (ENV_MODEL_VERSION, "DeepLeaf test"),
            (ENV_MODEL_PATH, "   "),
        ]
        .into_iter()
        .collect();

        let config = DeepLeafConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.models_dir, Path::new("/opt/leaf"));
        assert_eq!(config.model_path, Path::new("/opt/leaf/deepleaf_model.mpk"));
        assert_eq!(config.classes_path, Path::new("/etc/classes.json"));
        assert_eq!(config.health_model_path, Path::new("/opt/leaf/crop_health_model.mpk"));
        assert_eq!(config.model_version, "DeepLeaf test");
    }

    #[test]
    fn test_validation() {
        let mut config = DeepLeafConfig::default();
        config.model_input_size = 0;
        assert!(matches!(config.validate(), Err(DeepLeafError::Config(_))));

        let mut config = DeepLeafConfig::default();
        config.color_sample_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deepleaf.json");

        let config = DeepLeafConfig::with_models_dir(dir.path());
        config.save(&path).unwrap();
        assert_eq!(DeepLeafConfig::load(&path).unwrap(), config);
    }
}
