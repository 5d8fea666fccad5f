//! Model Inference Adapter
//!
//! This module provides:
//! - The [`Classifier`] contract and ranked predictions
//! - Class map loading in both on-disk encodings
//! - [`InferenceContext`], the owned once-per-process model state
//! - burn-backed implementations (with the `ndarray` or `cuda` feature)

pub mod class_map;
pub mod classifier;
pub mod context;

#[cfg(any(feature = "ndarray", feature = "cuda"))]
pub mod burn_model;

pub use class_map::{ClassMap, PLANTVILLAGE_LABELS};
pub use classifier::{preprocess, Classifier, RankedClass, RankedPrediction};
pub use context::{Classification, InferenceContext, LoadedModel, ModelLoader};

#[cfg(any(feature = "ndarray", feature = "cuda"))]
pub use burn_model::{BurnClassifier, BurnHealthModel};

/// Number of top-ranked classes scanned for a "healthy" label
pub const HEALTHY_SCAN_DEPTH: usize = 3;
