//! Symptom Detector
//!
//! Turns color features into coarse visual symptom flags and a 0-100 health
//! score. Thresholds are deliberately conservative: a leaf is scored healthy
//! unless the color evidence is strong.

use serde::{Deserialize, Serialize};

use super::color::ColorFeatures;

/// Starting score before penalties
pub const BASE_HEALTH_SCORE: f64 = 92.0;
/// Lower clamp of the health score
pub const MIN_HEALTH_SCORE: f64 = 40.0;
/// Upper clamp of the health score
pub const MAX_HEALTH_SCORE: f64 = 97.0;

const DISCOLORATION_PENALTY: f64 = 12.0;
const CHLOROSIS_PENALTY: f64 = 18.0;
const NECROTIC_SPOTS_PENALTY: f64 = 18.0;
const WILTING_PENALTY: f64 = 15.0;
const ABNORMAL_TEXTURE_PENALTY: f64 = 10.0;

/// Visual symptom flags plus the heuristic health score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymptomFlags {
    pub discoloration: bool,
    pub chlorosis: bool,
    pub necrotic_spots: bool,
    pub wilting: bool,
    pub abnormal_texture: bool,
    /// Heuristic health score in [40, 97]
    pub health_score: f64,
}

impl SymptomFlags {
    /// Derive flags and score from color features.
    pub fn detect(features: &ColorFeatures) -> Self {
        let brightness = features.brightness;
        let green_dom = features.green_dominance;
        let yellow_tint = features.yellow_tint;
        let dryness = features.dryness;
        let std_rgb = features.std_rgb;

        let discoloration = std_rgb > 0.20 && brightness < 0.85;
        let chlorosis = yellow_tint > 0.16 && green_dom < 0.06;
        let necrotic_spots = std_rgb > 0.26 && brightness < 0.70;
        let wilting = dryness > 0.55 && brightness < 0.55;
        let abnormal_texture = std_rgb > 0.23 && green_dom.abs() < 0.10;

        let mut score = BASE_HEALTH_SCORE;
        if discoloration {
            score -= DISCOLORATION_PENALTY;
        }
        if chlorosis {
            score -= CHLOROSIS_PENALTY;
        }
        if necrotic_spots {
            score -= NECROTIC_SPOTS_PENALTY;
        }
        if wilting {
            score -= WILTING_PENALTY;
        }
        if abnormal_texture {
            score -= ABNORMAL_TEXTURE_PENALTY;
        }

        // Yellowing and dryness still cost points when the flags stay off.
        score -= yellow_penalty(yellow_tint);
        score -= (0.0f64).max((dryness - 0.5) * 50.0);

        Self {
            discoloration,
            chlorosis,
            necrotic_spots,
            wilting,
            abnormal_texture,
            health_score: score.clamp(MIN_HEALTH_SCORE, MAX_HEALTH_SCORE),
        }
    }

    /// Number of flags that are set
    pub fn count(&self) -> usize {
        [
            self.discoloration,
            self.chlorosis,
            self.necrotic_spots,
            self.wilting,
            self.abnormal_texture,
        ]
        .iter()
        .filter(|&&flag| flag)
        .count()
    }

    pub fn any(&self) -> bool {
        self.count() > 0
    }

    /// Names of the set flags, in declaration order
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.discoloration {
            names.push("discoloration");
        }
        if self.chlorosis {
            names.push("chlorosis");
        }
        if self.necrotic_spots {
            names.push("necrotic_spots");
        }
        if self.wilting {
            names.push("wilting");
        }
        if self.abnormal_texture {
            names.push("abnormal_texture");
        }
        names
    }
}

/// Score penalty for yellowing: `max(0, (yellow_tint - 0.10) * 80)`.
///
/// Shared with the healthy-confidence formula of the health gate.
pub fn yellow_penalty(yellow_tint: f64) -> f64 {
    (0.0f64).max((yellow_tint - 0.10) * 80.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(std_rgb: f64, brightness: f64, green: f64, yellow: f64, dryness: f64) -> ColorFeatures {
        ColorFeatures {
            mean_r: 0.3,
            mean_g: 0.5,
            mean_b: 0.3,
            std_rgb,
            brightness,
            green_dominance: green,
            yellow_tint: yellow,
            dryness,
        }
    }

    #[test]
    fn test_clean_leaf_has_no_flags() {
        let flags = SymptomFlags::detect(&features(0.05, 0.5, 0.2, 0.05, 0.3));
        assert!(!flags.any());
        assert_eq!(flags.health_score, 92.0);
    }

    #[test]
    fn test_each_flag_threshold() {
        assert!(SymptomFlags::detect(&features(0.21, 0.84, 0.2, 0.0, 0.3)).discoloration);
        assert!(!SymptomFlags::detect(&features(0.21, 0.86, 0.2, 0.0, 0.3)).discoloration);

        assert!(SymptomFlags::detect(&features(0.05, 0.5, 0.05, 0.17, 0.3)).chlorosis);
        assert!(!SymptomFlags::detect(&features(0.05, 0.5, 0.07, 0.17, 0.3)).chlorosis);

        assert!(SymptomFlags::detect(&features(0.27, 0.69, 0.2, 0.0, 0.3)).necrotic_spots);
        assert!(SymptomFlags::detect(&features(0.05, 0.54, 0.2, 0.0, 0.56)).wilting);

        assert!(SymptomFlags::detect(&features(0.24, 0.9, 0.09, 0.0, 0.3)).abnormal_texture);
        assert!(!SymptomFlags::detect(&features(0.24, 0.9, -0.11, 0.0, 0.3)).abnormal_texture);
    }

    #[test]
    fn test_penalties_accumulate() {
        // discoloration (12) + yellow penalty (0.05 * 80 = 4)
        let flags = SymptomFlags::detect(&features(0.21, 0.8, 0.2, 0.15, 0.3));
        assert_eq!(flags.count(), 1);
        assert!((flags.health_score - 76.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_clamped() {
        let flags = SymptomFlags::detect(&features(0.3, 0.3, 0.0, 0.6, 0.8));
        assert_eq!(flags.count(), 5);
        assert_eq!(flags.health_score, MIN_HEALTH_SCORE);
        assert_eq!(
            flags.names(),
            vec!["discoloration", "chlorosis", "necrotic_spots", "wilting", "abnormal_texture"]
        );
    }
}
