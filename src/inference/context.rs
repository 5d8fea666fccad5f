//! Inference Context
//!
//! Owns the trained artifacts for the lifetime of the process. The disease
//! classifier and its class map are loaded on first use, at most once even
//! under concurrent first access, and never reloaded afterwards. A failed
//! load is not cached: the next request tries again, so weights dropped in
//! later are picked up without a restart.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use image::RgbImage;
use tracing::{debug, info};

use super::class_map::ClassMap;
use super::classifier::{Classifier, RankedPrediction};
use crate::backend;
use crate::config::DeepLeafConfig;
use crate::health::HealthModel;
use crate::utils::{DeepLeafError, Result};

/// Classifier plus the labels of its output classes
pub struct LoadedModel {
    pub classifier: Box<dyn Classifier>,
    pub class_map: ClassMap,
    /// Provenance string reported on model-backed results
    pub model_version: String,
}

/// Builds the classifier and class map from a configuration
pub type ModelLoader = Box<dyn Fn(&DeepLeafConfig) -> Result<LoadedModel> + Send + Sync>;

/// One classifier run
#[derive(Debug, Clone)]
pub struct Classification<'a> {
    pub ranked: RankedPrediction,
    pub class_map: &'a ClassMap,
    pub model_version: &'a str,
}

impl Classification<'_> {
    /// Raw label of the top-1 class
    pub fn top1_label(&self) -> Option<String> {
        self.ranked
            .top1()
            .map(|class| self.class_map.label_or_placeholder(class.index))
    }
}

/// Process-wide model state, passed by reference into every diagnosis
pub struct InferenceContext {
    config: DeepLeafConfig,
    loader: ModelLoader,
    model: OnceLock<LoadedModel>,
    health_model: OnceLock<Box<dyn HealthModel>>,
    load_lock: Mutex<()>,
}

impl InferenceContext {
    /// Lazily load artifacts from the configured paths.
    pub fn new(config: DeepLeafConfig) -> Self {
        Self::with_loader(config, load_model)
    }

    /// Lazily load the classifier through `loader` instead of the burn
    /// checkpoint on disk.
    pub fn with_loader(
        config: DeepLeafConfig,
        loader: impl Fn(&DeepLeafConfig) -> Result<LoadedModel> + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            loader: Box::new(loader),
            model: OnceLock::new(),
            health_model: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    /// Context around an already-built classifier.
    pub fn preloaded(
        classifier: impl Classifier + 'static,
        class_map: ClassMap,
        model_version: impl Into<String>,
    ) -> Self {
        let context = Self::new(DeepLeafConfig::default());
        let _ = context.model.set(LoadedModel {
            classifier: Box::new(classifier),
            class_map,
            model_version: model_version.into(),
        });
        context
    }

    /// Install an already-built health model.
    pub fn with_health_model(self, model: impl HealthModel + 'static) -> Self {
        let _ = self.health_model.set(Box::new(model));
        self
    }

    pub fn config(&self) -> &DeepLeafConfig {
        &self.config
    }

    /// Whether the disease classifier has been loaded
    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// The disease classifier, loading it on first access.
    pub fn model(&self) -> Result<&LoadedModel> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }

        let _guard = self
            .load_lock
            .lock()
            .map_err(|_| DeepLeafError::ModelUnavailable("model load lock poisoned".to_string()))?;

        // Another thread may have finished loading while we waited.
        if let Some(model) = self.model.get() {
            return Ok(model);
        }

        let loaded = (self.loader)(&self.config)?;
        info!(
            classifier = loaded.classifier.name(),
            classes = loaded.class_map.len(),
            version = %loaded.model_version,
            "Disease classifier loaded"
        );
        Ok(self.model.get_or_init(|| loaded))
    }

    /// The crop health model, loading it on first access.
    pub fn health_model(&self) -> Result<&dyn HealthModel> {
        if let Some(model) = self.health_model.get() {
            return Ok(model.as_ref());
        }

        let _guard = self
            .load_lock
            .lock()
            .map_err(|_| DeepLeafError::ModelUnavailable("model load lock poisoned".to_string()))?;

        if let Some(model) = self.health_model.get() {
            return Ok(model.as_ref());
        }

        let loaded = load_health_model(&self.config)?;
        info!(multi_modal = loaded.is_multi_modal(), "Crop health model loaded");
        Ok(self.health_model.get_or_init(|| loaded).as_ref())
    }

    /// Run the classifier and rank its output.
    ///
    /// Backend panics are contained here and reported as inference errors.
    pub fn classify(&self, image: &RgbImage) -> Result<Classification<'_>> {
        let model = self.model()?;

        let probabilities = panic::catch_unwind(AssertUnwindSafe(|| model.classifier.predict(image)))
            .map_err(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                DeepLeafError::Inference(format!("classifier panicked: {}", message))
            })??;

        if probabilities.is_empty() {
            return Err(DeepLeafError::Inference(
                "classifier returned no probabilities".to_string(),
            ));
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(DeepLeafError::Inference(
                "classifier returned non-finite probabilities".to_string(),
            ));
        }

        let ranked = RankedPrediction::from_probabilities(&probabilities);
        debug!(
            top1 = ranked.top1().map(|c| c.index),
            probability = ranked.top1_probability(),
            "Classifier output ranked"
        );

        Ok(Classification {
            ranked,
            class_map: &model.class_map,
            model_version: &model.model_version,
        })
    }
}

fn load_model(config: &DeepLeafConfig) -> Result<LoadedModel> {
    if !backend::backend_available() {
        return Err(DeepLeafError::ModelUnavailable(
            "classifier backend not compiled in".to_string(),
        ));
    }

    require_file(&config.model_path, "classifier weights")?;
    require_file(&config.classes_path, "class map")?;

    let class_map = ClassMap::load(&config.classes_path).map_err(|e| {
        DeepLeafError::ModelUnavailable(format!(
            "class map {} unusable: {}",
            config.classes_path.display(),
            e
        ))
    })?;

    let classifier = load_classifier(config, class_map.num_classes())?;
    Ok(LoadedModel {
        classifier,
        class_map,
        model_version: config.model_version.clone(),
    })
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DeepLeafError::ModelUnavailable(format!(
            "{} not found at {}",
            what,
            path.display()
        )))
    }
}

#[cfg(any(feature = "ndarray", feature = "cuda"))]
fn load_classifier(config: &DeepLeafConfig, num_classes: usize) -> Result<Box<dyn Classifier>> {
    let classifier = super::burn_model::BurnClassifier::load(
        &config.model_path,
        num_classes,
        config.model_input_size,
    )?;
    Ok(Box::new(classifier))
}

#[cfg(not(any(feature = "ndarray", feature = "cuda")))]
fn load_classifier(_config: &DeepLeafConfig, _num_classes: usize) -> Result<Box<dyn Classifier>> {
    Err(DeepLeafError::ModelUnavailable(
        "classifier backend not compiled in".to_string(),
    ))
}

#[cfg(any(feature = "ndarray", feature = "cuda"))]
fn load_health_model(config: &DeepLeafConfig) -> Result<Box<dyn HealthModel>> {
    require_file(&config.health_model_path, "health model weights")?;
    let model =
        super::burn_model::BurnHealthModel::load(&config.health_model_path, config.model_input_size)?;
    Ok(Box::new(model))
}

#[cfg(not(any(feature = "ndarray", feature = "cuda")))]
fn load_health_model(_config: &DeepLeafConfig) -> Result<Box<dyn HealthModel>> {
    Err(DeepLeafError::ModelUnavailable(
        "classifier backend not compiled in".to_string(),
    ))
}
