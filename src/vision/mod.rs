//! Model-independent image analysis
//!
//! - `color`: downsampled color statistics and the pixel content hash
//! - `symptoms`: symptom flags and the conservative heuristic health score

pub mod color;
pub mod symptoms;

pub use color::{extract_color_features, ColorFeatures, ColorSample, COLOR_SAMPLE_SIZE};
pub use symptoms::{yellow_penalty, SymptomFlags};

use image::RgbImage;

use crate::utils::{DeepLeafError, Result};

/// Decode raw bytes of any supported raster format into a 3-channel image.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes).map_err(|e| DeepLeafError::Decode(e.to_string()))?;
    Ok(image.to_rgb8())
}
