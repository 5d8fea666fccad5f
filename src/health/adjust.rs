//! Crop-Conditioned Probability Adjustment
//!
//! Deterministically shifts a `[healthy, moderate, critical]` probability
//! vector according to the declared crop, so a crop-agnostic health model
//! still gives different crops distinct, reproducible outcomes.
//!
//! ```text
//! index      = crop_index(crop)
//! adjustment = base_magnitude * (0.6 + (index mod modulus) * 0.1)
//! pattern    = index mod 3   (0: healthy, 1: moderate, 2: critical)
//! ```
//!
//! The favored class gains `adjustment`; the other two lose a weighted share
//! of it. Entries are floored at zero and the vector is renormalized.

use serde::{Deserialize, Serialize};

use super::context::{crop_index, is_declared};

const EPSILON: f64 = 1e-8;

/// Magnitude constants of one pipeline variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropAdjustment {
    pub base_magnitude: f64,
    pub modulus: usize,
}

impl CropAdjustment {
    /// Image-only health models
    pub const SINGLE_MODAL: Self = Self {
        base_magnitude: 0.30,
        modulus: 9,
    };

    /// Context-aware health models
    pub const MULTI_MODAL: Self = Self {
        base_magnitude: 0.15,
        modulus: 10,
    };

    /// Adjustment magnitude for a crop index
    pub fn magnitude(&self, index: usize) -> f64 {
        self.base_magnitude * (0.6 + (index % self.modulus) as f64 * 0.1)
    }

    /// Adjust `probabilities` for `crop_type`.
    ///
    /// Absent or "Unknown" crops leave the vector untouched.
    pub fn apply(&self, crop_type: Option<&str>, probabilities: [f64; 3]) -> [f64; 3] {
        match crop_type {
            Some(crop) if is_declared(Some(crop)) => self.apply_index(crop_index(crop), probabilities),
            _ => probabilities,
        }
    }

    /// Adjust for an explicit crop index.
    pub fn apply_index(&self, index: usize, probabilities: [f64; 3]) -> [f64; 3] {
        let adj = self.magnitude(index);
        let [mut healthy, mut moderate, mut critical] = probabilities;

        match index % 3 {
            0 => {
                healthy += adj;
                moderate -= adj * 0.5;
                critical -= adj * 0.8;
            }
            1 => {
                moderate += adj;
                healthy -= adj * 0.7;
                critical -= adj * 0.5;
            }
            _ => {
                critical += adj;
                healthy -= adj * 0.8;
                moderate -= adj * 0.5;
            }
        }

        let floored = [healthy.max(0.0), moderate.max(0.0), critical.max(0.0)];
        let total = floored.iter().sum::<f64>() + EPSILON;
        [floored[0] / total, floored[1] / total, floored[2] / total]
    }
}
