//! Network definitions
//!
//! Architecture only; weights are trained elsewhere and loaded through
//! `inference::burn_model`.

pub mod cnn;

pub use cnn::{
    Backbone, ConvBlock, CropHealthNet, CropHealthNetConfig, LeafNet, LeafNetConfig,
    DISEASE_INDICATORS, HEALTH_CLASSES,
};
