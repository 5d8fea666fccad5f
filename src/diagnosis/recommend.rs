//! Recommendation tables
//!
//! Static agronomic guidance. Model results look up by keyword in the
//! disease key; heuristic results look up by their fixed label.

use serde::{Deserialize, Serialize};

/// Cause, treatment and prevention text for one diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub cause: &'static str,
    pub solution: &'static str,
    pub prevention: &'static str,
}

const HEALTHY: Recommendation = Recommendation {
    cause: "No disease detected - Plant is healthy.",
    solution: "Continue balanced nutrition, irrigation and weekly scouting.",
    prevention: "Maintain crop rotation, monitor pests, keep fields weed-free.",
};

const BLIGHT: Recommendation = Recommendation {
    cause: "Fungal infection thriving in humid, stagnant air.",
    solution: "Spray Mancozeb/Chlorothalonil, remove infected leaves, improve drainage.",
    prevention: "Avoid overhead irrigation, ensure spacing, rotate crops every season.",
};

const RUST: Recommendation = Recommendation {
    cause: "Rust spores spread by wind and dew on leaves.",
    solution: "Apply systemic fungicide (triazole group), prune severely affected foliage.",
    prevention: "Plant resistant hybrids, sanitize tools, avoid working wet fields.",
};

const SPOT_OR_MOSAIC: Recommendation = Recommendation {
    cause: "Bacterial or viral lesions spread via splashing water or insects.",
    solution: "Remove infected leaves, spray copper/bactericide, control sucking pests.",
    prevention: "Use certified seedlings, disinfect tools, mulch to limit splash.",
};

const MILDEW_OR_MOLD: Recommendation = Recommendation {
    cause: "Powdery spores colonize shaded leaves during humid nights.",
    solution: "Spray sulfur or potassium bicarbonate, trim crowded shoots.",
    prevention: "Improve sunlight penetration, reduce nitrogen spikes, monitor weekly.",
};

const GENERIC: Recommendation = Recommendation {
    cause: "Pathogen stress (fungal/bacterial).",
    solution: "Use appropriate fungicide/bactericide, remove affected leaves, ensure airflow.",
    prevention: "Rotate crops, maintain sanitation, avoid waterlogging.",
};

/// Guidance for a model label.
///
/// Precedence: healthy, blight, rust, spot/mosaic, mildew/mold, generic.
pub fn recommendation_for(disease_key: &str, is_healthy: bool) -> Recommendation {
    if is_healthy {
        return HEALTHY;
    }
    let name = disease_key.to_lowercase();
    if name.contains("blight") {
        BLIGHT
    } else if name.contains("rust") {
        RUST
    } else if name.contains("spot") || name.contains("mosaic") {
        SPOT_OR_MOSAIC
    } else if name.contains("mildew") || name.contains("mold") {
        MILDEW_OR_MOLD
    } else {
        GENERIC
    }
}

/// Guidance for a healthy verdict of the health gate
pub const GATE_HEALTHY: Recommendation = Recommendation {
    cause: "No disease patterns or stress symptoms detected in the image.",
    solution: "Continue regular irrigation, balanced fertiliser and field scouting.",
    prevention: "Maintain crop rotation, monitor pests and keep field weed\u{2011}free.",
};

/// Labels the heuristic classifier can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeuristicLabel {
    HealthyCrop,
    LeafSpot,
    NutrientDeficiency,
    LeafBlight,
    Rust,
    PowderyMildew,
}

impl HeuristicLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HealthyCrop => "Healthy Crop",
            Self::LeafSpot => "Leaf Spot",
            Self::NutrientDeficiency => "Nutrient Deficiency",
            Self::LeafBlight => "Leaf Blight",
            Self::Rust => "Rust",
            Self::PowderyMildew => "Powdery Mildew",
        }
    }

    pub fn is_healthy(&self) -> bool {
        *self == Self::HealthyCrop
    }

    /// Base confidence before the feature and hash terms are added
    pub fn base_confidence(&self) -> u32 {
        match self {
            Self::HealthyCrop => 82,
            Self::LeafSpot => 65,
            Self::NutrientDeficiency => 67,
            Self::LeafBlight => 66,
            Self::Rust => 66,
            Self::PowderyMildew => 64,
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        match self {
            Self::HealthyCrop => Recommendation {
                cause: "No clear disease patterns detected \u{2013} foliage appears healthy and well nourished.",
                solution: "Maintain your current irrigation and nutrition schedule; continue routine scouting.",
                prevention: "Keep following good agronomy practices: crop rotation, balanced fertiliser and timely pest monitoring.",
            },
            Self::LeafBlight => Recommendation {
                cause: "Fungal pathogens thrive in humid canopies with poor airflow.",
                solution: "Remove infected leaves, spray copper fungicide, improve ventilation.",
                prevention: "Avoid overhead irrigation, ensure spacing, rotate crops yearly.",
            },
            Self::Rust => Recommendation {
                cause: "Rust spores spread by wind during warm humid spells.",
                solution: "Apply systemic fungicide (triazole group) and trim infected leaves.",
                prevention: "Use resistant varieties, sanitize tools, keep foliage dry.",
            },
            Self::LeafSpot => Recommendation {
                cause: "Bacterial/fungal spots triggered by splashing water and dew.",
                solution: "Spray Mancozeb or Chlorothalonil, avoid working plants when wet.",
                prevention: "Mulch soil, favor drip irrigation, rotate host crops.",
            },
            Self::PowderyMildew => Recommendation {
                cause: "Powdery spores colonize shaded leaves with dry days/humid nights.",
                solution: "Apply potassium bicarbonate or sulfur spray, prune crowded shoots.",
                prevention: "Increase sunlight penetration, avoid high nitrogen, monitor weekly.",
            },
            Self::NutrientDeficiency => Recommendation {
                cause: "Imbalance in nitrogen/potassium and micronutrients causing chlorosis.",
                solution: "Apply balanced NPK plus micronutrients, add compost tea foliar feed.",
                prevention: "Test soil each season, maintain organic matter, ensure drainage.",
            },
        }
    }
}

impl std::fmt::Display for HeuristicLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_precedence() {
        assert_eq!(recommendation_for("Northern Leaf Blight", false), BLIGHT);
        assert_eq!(recommendation_for("Common Rust", false), RUST);
        assert_eq!(recommendation_for("Cedar Apple Rust", false), RUST);
        assert_eq!(recommendation_for("Bacterial Spot", false), SPOT_OR_MOSAIC);
        assert_eq!(recommendation_for("Tomato Mosaic Virus", false), SPOT_OR_MOSAIC);
        assert_eq!(recommendation_for("Leaf Mold", false), MILDEW_OR_MOLD);
        assert_eq!(recommendation_for("Esca (black Measles)", false), GENERIC);
    }

    #[test]
    fn test_blight_wins_over_spot() {
        // "Leaf Blight (isariopsis Leaf Spot)" carries both keywords
        assert_eq!(recommendation_for("Leaf Blight (isariopsis Leaf Spot)", false), BLIGHT);
    }

    #[test]
    fn test_healthy_overrides_keywords() {
        assert_eq!(recommendation_for("Rust", true), HEALTHY);
    }

    #[test]
    fn test_heuristic_labels() {
        assert_eq!(HeuristicLabel::HealthyCrop.to_string(), "Healthy Crop");
        assert!(HeuristicLabel::HealthyCrop.is_healthy());
        assert!(!HeuristicLabel::Rust.is_healthy());
        assert_eq!(
            HeuristicLabel::NutrientDeficiency.recommendation().solution,
            "Apply balanced NPK plus micronutrients, add compost tea foliar feed."
        );
    }
}
